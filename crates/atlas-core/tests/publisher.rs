use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use atlas_core::fixture::{RoomSpec, WorldFixture};
use atlas_core::memory::{Address, MockMemoryReader, MockSource};
use atlas_core::{
    AreaId, CodeNames, LayoutRegistry, Point, PublisherConfig, ResponseBuilder, ShutdownSignal,
    SnapshotPublisher,
};

/// A level of `rooms` 4x4 rooms in a row starting at `origin`, player in the first
fn area(area: u32, origin: Point, rooms: usize) -> MockMemoryReader {
    let mut fixture = WorldFixture::new();
    let level = fixture.level(area);
    let addrs: Vec<Address> = (0..rooms)
        .map(|i| {
            let room_origin = Point::new(origin.x + i as i32 * 4, origin.y);
            fixture.room(RoomSpec::open(level, room_origin, 4, 4))
        })
        .collect();
    for (i, room) in addrs.iter().enumerate() {
        let near: Vec<Address> = [i.checked_sub(1), Some(i + 1)]
            .into_iter()
            .flatten()
            .filter(|&j| j < rooms)
            .map(|j| addrs[j])
            .collect();
        fixture.link(*room, &near);
    }
    fixture.player(
        "Local",
        1,
        Point::new(origin.x + 1, origin.y + 1),
        Some(addrs[0]),
        true,
    );
    fixture.reader()
}

fn publisher(reader: MockMemoryReader) -> SnapshotPublisher<MockSource> {
    SnapshotPublisher::new(
        MockSource::new(reader),
        LayoutRegistry::builtin(),
        PublisherConfig::default(),
        Arc::new(ShutdownSignal::new()),
    )
}

#[test]
fn readers_never_see_a_mixed_snapshot() {
    let town = area(1, Point::new(0, 0), 2);
    let field = area(2, Point::new(100, 40), 3);
    let publisher = publisher(town.clone());
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let mut last_sequence = 0;
                while !done.load(Ordering::SeqCst) {
                    let Some(snapshot) = publisher.current() else {
                        continue;
                    };
                    assert!(snapshot.sequence >= last_sequence);
                    last_sequence = snapshot.sequence;

                    let data = &snapshot.area_data;
                    assert_eq!(data.area, snapshot.area);
                    match snapshot.area {
                        AreaId(1) => {
                            assert_eq!(data.origin, Point::new(0, 0));
                            assert_eq!((data.width(), data.height()), (8, 4));
                        }
                        AreaId(2) => {
                            assert_eq!(data.origin, Point::new(100, 40));
                            assert_eq!((data.width(), data.height()), (12, 4));
                        }
                        other => panic!("unexpected area {}", other),
                    }
                    assert_eq!(snapshot.player_grid_position(), Point::new(1, 1));
                }
            });
        }

        for i in 0..200 {
            let next = if i % 2 == 0 { &field } else { &town };
            publisher.source().set(Some(next.clone()));
            publisher.run_cycle().unwrap();
        }
        done.store(true, Ordering::SeqCst);
    });

    assert_eq!(publisher.current().unwrap().sequence, 200);
}

#[test]
fn unchanged_memory_yields_equal_snapshots() {
    let publisher = publisher(area(1, Point::new(0, 0), 3));

    let first = publisher.run_cycle().unwrap().unwrap();
    let second = publisher.run_cycle().unwrap().unwrap();

    assert_eq!(second.sequence, first.sequence + 1);
    assert_eq!(first.units, second.units);
    assert_eq!(first.player, second.player);
    assert!(Arc::ptr_eq(&first.area_data.grid, &second.area_data.grid));
    assert_eq!(
        first.area_data.points_of_interest,
        second.area_data.points_of_interest
    );
}

#[test]
fn game_exit_keeps_last_snapshot_and_responses_fall_back() {
    let publisher = publisher(area(1, Point::new(0, 0), 2));
    let mut responses = ResponseBuilder::new(CodeNames);

    let published = publisher.run_cycle().unwrap().unwrap();
    let response = responses.build(publisher.current().as_deref(), false);
    assert!(response.success);
    assert!(response.collision_grid.is_some());

    publisher.source().set(None);
    assert!(publisher.run_cycle().is_err());

    let retained = publisher.get_snapshot(true).unwrap();
    assert!(Arc::ptr_eq(&published, &retained));

    let response = responses.build(Some(&retained), false);
    assert!(response.success);
    assert!(response.collision_grid.is_none());
    assert!(!responses.build(None, false).success);
}

#[test]
fn shutdown_stops_cycles() {
    let publisher = publisher(area(1, Point::new(0, 0), 2));
    publisher.shutdown().trigger();

    assert!(publisher.run_cycle().unwrap().is_none());
    assert!(publisher.get_snapshot(true).is_none());
    assert_eq!(publisher.source().acquisitions(), 0);
}
