use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::models::{Coordinate, Route, VehiclePosition};

/// Cyclic position state for one vehicle: the current route index,
/// advanced one waypoint per tick, wrapping after the last point.
#[derive(Debug, Clone)]
pub struct RouteCursor {
    route: Route,
    index: usize,
}

impl RouteCursor {
    pub fn new(route: Route) -> RouteCursor {
        RouteCursor { route, index: 0 }
    }

    pub fn position(&self) -> VehiclePosition {
        VehiclePosition {
            index: self.index,
            coords: self.route.point(self.index),
        }
    }

    pub fn advance(&mut self) -> VehiclePosition {
        self.index = (self.index + 1) % self.route.len();
        self.position()
    }
}

/// Owner of one running bus simulation. Dropping the handle (and every
/// subscriber) ends the background task; `stop` ends it immediately.
pub struct TrackerHandle {
    position: watch::Receiver<VehiclePosition>,
    task: JoinHandle<()>,
}

/// Starts the periodic simulation. The initial position (`route[0]`,
/// index 0) is observable before the first tick fires.
pub fn start(route: Route, tick: Duration) -> TrackerHandle {
    let mut cursor = RouteCursor::new(route);
    let (tx, rx) = watch::channel(cursor.position());

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tick);
        // interval yields immediately on the first call; that is the
        // initial position, not a transition.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if tx.send(cursor.advance()).is_err() {
                break;
            }
        }
    });

    TrackerHandle { position: rx, task }
}

impl TrackerHandle {
    pub fn current(&self) -> VehiclePosition {
        *self.position.borrow()
    }

    pub fn current_position(&self) -> Coordinate {
        self.position.borrow().coords
    }

    /// Receiver for observers that await position changes. Each update
    /// is a fully committed position; observers never see a torn state.
    pub fn subscribe(&self) -> watch::Receiver<VehiclePosition> {
        self.position.clone()
    }

    /// Cancels the simulation task. The last committed position stays
    /// readable through `current_position`.
    pub fn stop(&self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_route() -> Route {
        Route::new(vec![
            Coordinate::new(20.2959, 85.8245),
            Coordinate::new(20.2965, 85.8255),
            Coordinate::new(20.2972, 85.8262),
        ])
        .unwrap()
    }

    #[test]
    fn cursor_wraps_after_full_cycle() {
        let mut cursor = RouteCursor::new(demo_route());
        let start_index = cursor.position().index;
        for _ in 0..3 {
            cursor.advance();
        }
        assert_eq!(cursor.position().index, start_index);
    }

    #[test]
    fn cursor_visits_points_in_order() {
        let route = demo_route();
        let mut cursor = RouteCursor::new(route.clone());
        for expected in [1, 2, 0, 1] {
            let pos = cursor.advance();
            assert_eq!(pos.index, expected);
            assert_eq!(pos.coords, route.point(expected));
        }
    }

    #[test]
    fn single_point_route_is_rejected() {
        let result = Route::new(vec![Coordinate::new(20.2959, 85.8245)]);
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn position_is_route_start_before_first_tick() {
        let handle = start(demo_route(), Duration::from_millis(2000));
        assert_eq!(handle.current().index, 0);
        assert_eq!(handle.current_position(), Coordinate::new(20.2959, 85.8245));
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn three_ticks_complete_the_demo_cycle() {
        let handle = start(demo_route(), Duration::from_millis(2000));
        let mut rx = handle.subscribe();
        for expected in [1, 2, 0] {
            rx.changed().await.unwrap();
            assert_eq!(rx.borrow().index, expected);
        }
        assert_eq!(handle.current_position(), Coordinate::new(20.2959, 85.8245));
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_freezes_the_position() {
        let handle = start(demo_route(), Duration::from_millis(100));
        let mut rx = handle.subscribe();
        rx.changed().await.unwrap();
        let before = handle.current();

        handle.stop();
        while !handle.task.is_finished() {
            tokio::task::yield_now().await;
        }

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(handle.current(), before);
    }
}
