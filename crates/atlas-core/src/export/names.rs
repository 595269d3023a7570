use crate::world::AreaId;

/// Display names for numeric type codes.
///
/// Name tables live outside this crate; implementations plug them in.
pub trait NameResolver {
    fn monster(&self, code: u32) -> String;

    fn object(&self, code: u32) -> String;

    fn item(&self, code: u32) -> String;

    fn area(&self, area: AreaId) -> String {
        area.to_string()
    }
}

/// Resolver that prints the numeric code itself
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeNames;

impl NameResolver for CodeNames {
    fn monster(&self, code: u32) -> String {
        code.to_string()
    }

    fn object(&self, code: u32) -> String {
        code.to_string()
    }

    fn item(&self, code: u32) -> String {
        code.to_string()
    }
}

impl<N: NameResolver + ?Sized> NameResolver for &N {
    fn monster(&self, code: u32) -> String {
        (**self).monster(code)
    }

    fn object(&self, code: u32) -> String {
        (**self).object(code)
    }

    fn item(&self, code: u32) -> String {
        (**self).item(code)
    }

    fn area(&self, area: AreaId) -> String {
        (**self).area(area)
    }
}
