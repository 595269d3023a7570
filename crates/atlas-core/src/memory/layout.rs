//! Memory access constants
//!
//! Bounds applied to every foreign read, plus the fixed shapes of the game's
//! global tables. Per-structure field offsets live in versioned layout sets
//! (see [`crate::layout`]), not here.

/// Plausibility bounds for addresses handed to a process context
pub mod bounds {
    /// Lowest user-mode address Windows ever maps (first 64KB are reserved)
    pub const MIN_USER_ADDRESS: u64 = 0x1_0000;

    /// Highest canonical user-mode address on x64
    pub const MAX_USER_ADDRESS: u64 = 0x7FFF_FFFF_FFFF;

    /// Largest single read a context will issue (1MB)
    pub const MAX_READ_SIZE: usize = 1024 * 1024;
}

/// Unit hash table shape
pub mod units {
    /// Buckets per unit type in the unit hash table
    pub const BUCKETS: usize = 128;

    /// Unit types stored in the table (player, monster, object, missile, item, tile)
    pub const TABLE_TYPES: usize = 6;

    /// Pointer width in the target process
    pub const PTR_SIZE: usize = 8;
}

/// Collision map sanity limits
pub mod collision {
    /// Bit set in a collision word when the subtile blocks movement
    pub const BLOCKED_MASK: u16 = 0x0001;

    /// Largest room edge accepted from memory (subtiles). A square room of
    /// this span, at two bytes per cell, still fits in one bounded read.
    pub const MAX_ROOM_SPAN: u32 = 512;

    /// Largest neighbor count accepted from a room record
    pub const MAX_NEAR_ROOMS: u32 = 64;
}

/// Timing constants for polling
pub mod timing {
    /// Interval between read cycles in the watch loop (ms)
    pub const POLL_INTERVAL_MS: u64 = 100;

    /// Delay before looking for the game process again (ms)
    pub const RECONNECT_DELAY_MS: u64 = 5000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_largest_room_fits_one_read() {
        let span = collision::MAX_ROOM_SPAN as usize;
        assert!(span * span * 2 <= bounds::MAX_READ_SIZE);
    }
}
