//! Unit tests for tms-dispatch.

#[cfg(test)]
mod helpers {
    use tms_core::{DispatchConfig, EquipmentId, Position, ProductId, TaskId, WarehouseId};
    use tms_registry::{Equipment, EquipmentKind, Product, Warehouse, WarehouseKind};

    use crate::Dispatcher;

    /// 20×20 open grid.  TW001 (0,0) holds 100 × P001 (1 t); PW001 (10,10)
    /// holds 50 × P003 (5 t); TW002 (0,10) is empty with capacity 50.
    /// C001 crane at (0,1) homed TW001; C002 crane at (10,11) homed PW001;
    /// T001 truck at (5,0) towing the 100 t frame F001.  The hitch is the
    /// only event the fixture logs.
    pub fn site() -> Dispatcher {
        site_with(DispatchConfig::with_grid(20, 20))
    }

    pub fn site_with(config: DispatchConfig) -> Dispatcher {
        let d = Dispatcher::new(config).unwrap();
        d.add_product(Product::new("P001", "steel", 1.0, 1.0)).unwrap();
        d.add_product(Product::new("P003", "timber", 5.0, 8.0)).unwrap();
        d.add_warehouse(
            Warehouse::new("TW001", "terminal", WarehouseKind::Terminal, Position::new(0, 0), 1000.0)
                .with_stock("P001", 100),
        )
        .unwrap();
        d.add_warehouse(
            Warehouse::new("PW001", "goods", WarehouseKind::FinishedGoods, Position::new(10, 10), 2000.0)
                .with_stock("P003", 50),
        )
        .unwrap();
        d.add_warehouse(Warehouse::new("TW002", "terminal 2", WarehouseKind::Terminal, Position::new(0, 10), 50.0))
            .unwrap();
        d.add_equipment(Equipment::new("C001", "crane 1", EquipmentKind::Crane, Position::new(0, 1)).with_home("TW001"))
            .unwrap();
        d.add_equipment(Equipment::new("C002", "crane 2", EquipmentKind::Crane, Position::new(10, 11)).with_home("PW001"))
            .unwrap();
        d.add_equipment(Equipment::new("T001", "truck 1", EquipmentKind::FrameTruck, Position::new(5, 0))).unwrap();
        d.add_equipment(
            Equipment::new("F001", "frame 1", EquipmentKind::Frame, Position::new(5, 1)).with_capacity(100.0),
        )
        .unwrap();
        d.attach_frame(&eq("T001"), &eq("F001")).unwrap();
        d
    }

    /// T002 at (6,0) towing its own 100 t frame F002.
    pub fn second_truck(d: &Dispatcher) {
        d.add_equipment(Equipment::new("T002", "truck 2", EquipmentKind::FrameTruck, Position::new(6, 0))).unwrap();
        d.add_equipment(
            Equipment::new("F002", "frame 2", EquipmentKind::Frame, Position::new(6, 1)).with_capacity(100.0),
        )
        .unwrap();
        d.attach_frame(&eq("T002"), &eq("F002")).unwrap();
    }

    pub fn eq(id: &str) -> EquipmentId {
        EquipmentId::new(id)
    }

    pub fn wh(id: &str) -> WarehouseId {
        WarehouseId::new(id)
    }

    pub fn stock(d: &Dispatcher, warehouse: &str, product: &str) -> u64 {
        d.warehouse(&wh(warehouse)).unwrap().quantity(&ProductId::new(product))
    }

    pub fn transfer(d: &Dispatcher, qty: u64) -> TaskId {
        d.create_internal_transfer("TW001", "TW002", [(ProductId::new("P001"), qty)], 1).unwrap()
    }

    pub fn load(d: &Dispatcher, qty: u64, priority: i32) -> TaskId {
        d.create_load("TW001", [(ProductId::new("P001"), qty)], priority).unwrap()
    }
}

// ── End-to-end scenarios ──────────────────────────────────────────────────────

#[cfg(test)]
mod scenarios {
    use tms_core::{EquipmentStatus, ErrorKind, Position, TaskStatus};
    use tms_registry::EquipmentUpdate;
    use tms_task::ShipPlan;

    use super::helpers::*;
    use crate::ShipOrder;

    #[test]
    fn one_crane_goes_to_the_higher_priority_load() {
        let d = site();
        let low = load(&d, 10, 1);
        let high = load(&d, 10, 5);

        let order = d.optimize_schedule().unwrap();
        assert_eq!(order, vec![high.clone()]);
        assert_eq!(d.task(&high).unwrap().status, TaskStatus::Assigned);
        assert_eq!(d.task(&low).unwrap().status, TaskStatus::Pending);

        let crane = d.equipment(&eq("C001")).unwrap();
        assert_eq!(crane.status, EquipmentStatus::Assigned);
        assert!(crane.is_held_by(&high));
    }

    #[test]
    fn transfer_runs_once_and_only_once() {
        let d = site();
        let id = transfer(&d, 10);
        assert_eq!(d.optimize_schedule().unwrap(), vec![id.clone()]);
        assert!(d.execute(&id).unwrap());

        assert_eq!(stock(&d, "TW001", "P001"), 90);
        assert_eq!(stock(&d, "TW002", "P001"), 10);
        let truck = d.equipment(&eq("T001")).unwrap();
        assert_eq!(truck.status, EquipmentStatus::Idle);
        assert_eq!(truck.position, Position::new(0, 10));
        // 5 + 10 moves and one handling tick.
        assert_eq!(d.now().0, 16);

        let err = d.execute(&id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert_eq!(stock(&d, "TW001", "P001"), 90);
        assert_eq!(stock(&d, "TW002", "P001"), 10);
        assert_eq!(d.now().0, 16);
    }

    #[test]
    fn ship_transport_resolves_source_and_needs_crane_and_truck() {
        let d = site();
        let order = ShipOrder::new(ShipPlan::new("carrier 1", "port").with_berth(Position::new(15, 10)))
            .with_product("P003", 20)
            .with_priority(2);
        let id = d.create_ship_transport(order).unwrap();
        assert_eq!(d.task(&id).unwrap().spec.pickup(), &wh("PW001"));

        d.optimize_schedule().unwrap();
        assert_eq!(d.task(&id).unwrap().equipment, vec![eq("C002"), eq("T001")]);

        assert!(d.execute(&id).unwrap());
        assert_eq!(stock(&d, "PW001", "P003"), 30);
        assert_eq!(d.equipment(&eq("T001")).unwrap().position, Position::new(15, 10));
    }

    #[test]
    fn ship_transport_without_a_goods_source_is_rejected() {
        let d = site();
        let order = ShipOrder::new(ShipPlan::new("carrier 1", "port")).with_product("P001", 5);
        assert_eq!(d.create_ship_transport(order).unwrap_err().kind(), ErrorKind::NotFound);
        assert!(d.tasks().is_empty());
    }

    #[test]
    fn ship_berth_must_be_free() {
        let d = site();
        d.set_obstacle(Position::new(15, 10), true).unwrap();
        let order = ShipOrder::new(ShipPlan::new("carrier 1", "port").with_berth(Position::new(15, 10)))
            .with_product("P003", 5);
        assert_eq!(d.create_ship_transport(order).unwrap_err().kind(), ErrorKind::InvalidPosition);
    }

    #[test]
    fn failed_execution_restores_stock_and_frees_the_crew() {
        let d = site();
        // TW002 only takes 50 t.
        let id = transfer(&d, 60);
        d.assign_equipment(&id, &[eq("T001")]).unwrap();
        assert!(!d.execute(&id).unwrap());

        let task = d.task(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.failure_reason.is_some());
        assert_eq!(stock(&d, "TW001", "P001"), 100);
        assert_eq!(stock(&d, "TW002", "P001"), 0);
        let truck = d.equipment(&eq("T001")).unwrap();
        assert_eq!(truck.status, EquipmentStatus::Idle);
        assert_eq!(truck.position, Position::new(5, 0));
    }

    #[test]
    fn scheduler_defers_what_stock_cannot_cover() {
        let d = site();
        let id = transfer(&d, 60);
        assert!(d.optimize_schedule().unwrap().is_empty());
        assert_eq!(d.task(&id).unwrap().status, TaskStatus::Pending);
        assert!(d.equipment(&eq("T001")).unwrap().is_idle());
    }

    #[test]
    fn assigned_transfers_keep_their_room_at_the_target() {
        let d = site();
        second_truck(&d);
        let first = transfer(&d, 40);
        assert_eq!(d.optimize_schedule().unwrap(), vec![first.clone()]);

        // A free truck is there, but TW002 only has 10 t left once the first lands.
        let second = transfer(&d, 40);
        assert!(d.optimize_schedule().unwrap().is_empty());
        assert_eq!(d.task(&second).unwrap().status, TaskStatus::Pending);
        assert!(d.equipment(&eq("T002")).unwrap().is_idle());

        assert!(d.execute(&first).unwrap());
        d.adjust_stock(&wh("TW002"), &"P001".into(), -40).unwrap();
        assert_eq!(d.optimize_schedule().unwrap(), vec![second]);
    }

    #[test]
    fn frame_derated_after_assignment_fails_at_execute() {
        let d = site();
        let id = transfer(&d, 40);
        assert_eq!(d.optimize_schedule().unwrap(), vec![id.clone()]);
        let update = EquipmentUpdate { capacity: Some(20.0), ..Default::default() };
        d.update_equipment(&eq("F001"), &update).unwrap();

        assert!(!d.execute(&id).unwrap());
        let task = d.task(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.failure_reason.unwrap().contains("crew no longer fits"));
        assert_eq!(stock(&d, "TW001", "P001"), 100);
        assert_eq!(stock(&d, "TW002", "P001"), 0);
        let truck = d.equipment(&eq("T001")).unwrap();
        assert!(truck.is_idle());
        assert_eq!(truck.position, Position::new(5, 0));
    }

    #[test]
    fn crane_rehomed_after_assignment_fails_at_execute() {
        let d = site();
        let id = load(&d, 10, 1);
        d.optimize_schedule().unwrap();
        let update = EquipmentUpdate { home: Some(Some(wh("PW001"))), ..Default::default() };
        d.update_equipment(&eq("C001"), &update).unwrap();

        assert!(!d.execute(&id).unwrap());
        assert_eq!(d.task(&id).unwrap().status, TaskStatus::Failed);
        assert_eq!(stock(&d, "TW001", "P001"), 100);
        assert!(d.equipment(&eq("C001")).unwrap().is_idle());
    }
}

// ── Manual assignment and cancellation ────────────────────────────────────────

#[cfg(test)]
mod assignment {
    use tms_core::{EquipmentStatus, ErrorKind, TaskStatus};

    use super::helpers::*;

    #[test]
    fn wrong_kind_is_unsupported() {
        let d = site();
        let id = transfer(&d, 10);
        let err = d.assign_equipment(&id, &[eq("C001")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_eq!(d.task(&id).unwrap().status, TaskStatus::Pending);
        assert!(d.equipment(&eq("C001")).unwrap().is_idle());
    }

    #[test]
    fn held_equipment_is_already_assigned() {
        let d = site();
        let first = transfer(&d, 10);
        let second = transfer(&d, 10);
        d.assign_equipment(&first, &[eq("T001")]).unwrap();
        let err = d.assign_equipment(&second, &[eq("T001")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyAssigned);
        assert!(d.equipment(&eq("T001")).unwrap().is_held_by(&first));
    }

    #[test]
    fn out_of_service_equipment_is_never_picked() {
        let d = site();
        d.set_out_of_service(&eq("T001")).unwrap();
        let id = transfer(&d, 10);
        assert!(d.optimize_schedule().unwrap().is_empty());
        assert_eq!(d.status().by_status.out_of_service, 1);

        d.return_to_service(&eq("T001")).unwrap();
        assert_eq!(d.optimize_schedule().unwrap(), vec![id]);
    }

    #[test]
    fn cancel_releases_equipment() {
        let d = site();
        let id = transfer(&d, 10);
        d.assign_equipment(&id, &[eq("T001")]).unwrap();
        d.cancel_task(&id).unwrap();

        assert_eq!(d.task(&id).unwrap().status, TaskStatus::Cancelled);
        let truck = d.equipment(&eq("T001")).unwrap();
        assert_eq!(truck.status, EquipmentStatus::Idle);
        assert_eq!(truck.current_task, None);

        assert_eq!(d.cancel_task(&id).unwrap_err().kind(), ErrorKind::InvalidTransition);
    }

    #[test]
    fn held_equipment_and_live_tasks_block_removal() {
        let d = site();
        let id = transfer(&d, 10);
        d.assign_equipment(&id, &[eq("T001")]).unwrap();
        assert_eq!(d.remove_equipment(&eq("T001")).unwrap_err().kind(), ErrorKind::InUse);
        assert_eq!(d.remove_warehouse(&wh("TW002")).unwrap_err().kind(), ErrorKind::InUse);
        assert_eq!(d.remove_task(&id).unwrap_err().kind(), ErrorKind::InUse);

        d.cancel_task(&id).unwrap();
        d.remove_warehouse(&wh("TW002")).unwrap();
        assert_eq!(d.remove_equipment(&eq("T001")).unwrap_err().kind(), ErrorKind::InUse);
        d.detach_frame(&eq("T001")).unwrap();
        d.remove_equipment(&eq("T001")).unwrap();
    }
}

// ── Grid edits, routing, moves ────────────────────────────────────────────────

#[cfg(test)]
mod grid {
    use tms_core::{DispatchConfig, DispatchEvent, ErrorKind, Position};
    use tms_registry::{Warehouse, WarehouseKind};

    use super::helpers::*;
    use crate::Dispatcher;

    #[test]
    fn open_ten_by_ten_corner_route_has_nineteen_cells() {
        let d = Dispatcher::new(DispatchConfig::with_grid(10, 10)).unwrap();
        let route = d.route(Position::new(0, 0), Position::new(9, 9)).unwrap();
        assert_eq!(route.len(), 19);
        assert_eq!(route.first(), Some(&Position::new(0, 0)));
        assert_eq!(route.last(), Some(&Position::new(9, 9)));
        assert_eq!(d.neighbors(Position::new(0, 0)).unwrap().len(), 2);
    }

    #[test]
    fn occupied_cells_cannot_be_blocked() {
        let d = site();
        let err = d.set_obstacle(Position::new(0, 0), true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPosition);
        let err = d.set_obstacle(Position::new(5, 0), true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPosition);
        assert!(!d.is_blocked(Position::new(0, 0)).unwrap());
    }

    #[test]
    fn obstacle_changes_are_logged_once() {
        let d = site();
        assert!(d.set_obstacle(Position::new(3, 3), true).unwrap());
        assert!(!d.set_obstacle(Position::new(3, 3), true).unwrap());
        assert!(d.is_blocked(Position::new(3, 3)).unwrap());

        let changes: Vec<_> = d
            .recent_events(0, 100)
            .into_iter()
            .filter(|e| matches!(e, DispatchEvent::ObstacleChanged { .. }))
            .collect();
        assert_eq!(changes.len(), 1);
        assert_eq!(d.status().obstacle_version, 1);
    }

    #[test]
    fn entities_need_free_in_bounds_cells() {
        let d = site();
        d.set_obstacle(Position::new(7, 7), true).unwrap();
        let blocked = Warehouse::new("TW009", "x", WarehouseKind::Terminal, Position::new(7, 7), 10.0);
        assert_eq!(d.add_warehouse(blocked).unwrap_err().kind(), ErrorKind::InvalidPosition);
        let outside = Warehouse::new("TW009", "x", WarehouseKind::Terminal, Position::new(20, 0), 10.0);
        assert_eq!(d.add_warehouse(outside).unwrap_err().kind(), ErrorKind::OutOfBounds);
        assert_eq!(d.set_obstacle(Position::new(-1, 0), true).unwrap_err().kind(), ErrorKind::OutOfBounds);
    }

    #[test]
    fn move_equipment_walks_the_route_and_advances_the_clock() {
        let d = site();
        let path = d.move_equipment(&eq("T001"), Position::new(5, 5)).unwrap();
        assert_eq!(path.len(), 6);
        assert_eq!(d.equipment(&eq("T001")).unwrap().position, Position::new(5, 5));
        assert_eq!(d.now().0, 5);
        assert_eq!(d.equipment(&eq("T001")).unwrap().busy_ticks, 5);
    }

    #[test]
    fn the_frame_is_towed_not_driven() {
        let d = site();
        d.move_equipment(&eq("T001"), Position::new(5, 5)).unwrap();
        assert_eq!(d.equipment(&eq("F001")).unwrap().position, Position::new(5, 5));

        let err = d.move_equipment(&eq("F001"), Position::new(9, 9)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert_eq!(d.set_out_of_service(&eq("F001")).unwrap_err().kind(), ErrorKind::InUse);

        d.detach_frame(&eq("T001")).unwrap();
        d.move_equipment(&eq("T001"), Position::new(5, 0)).unwrap();
        assert_eq!(d.equipment(&eq("F001")).unwrap().position, Position::new(5, 5));

        // Unhitched, the truck is never picked.
        let id = transfer(&d, 10);
        assert!(d.optimize_schedule().unwrap().is_empty());
        d.move_equipment(&eq("T001"), Position::new(5, 4)).unwrap();
        d.attach_frame(&eq("T001"), &eq("F001")).unwrap();
        assert_eq!(d.optimize_schedule().unwrap(), vec![id]);
    }

    #[test]
    fn only_idle_equipment_moves() {
        let d = site();
        d.set_out_of_service(&eq("T001")).unwrap();
        let err = d.move_equipment(&eq("T001"), Position::new(5, 5)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyAssigned);
        assert_eq!(d.now().0, 0);
    }

    #[test]
    fn cached_routes_are_reused_until_the_grid_changes() {
        let config = DispatchConfig { cache_routes: true, ..DispatchConfig::with_grid(20, 20) };
        let d = site_with(config);
        let a = d.route(Position::new(0, 5), Position::new(19, 5)).unwrap();
        let b = d.route(Position::new(0, 5), Position::new(19, 5)).unwrap();
        assert_eq!(a, b);
        assert_eq!(d.route_cache_stats(), Some((1, 1)));

        d.set_obstacle(Position::new(10, 5), true).unwrap();
        let c = d.route(Position::new(0, 5), Position::new(19, 5)).unwrap();
        assert!(!c.contains(&Position::new(10, 5)));
        assert_eq!(d.route_cache_stats(), Some((1, 2)));
    }
}

// ── Events ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod events {
    use tms_core::{DispatchConfig, DispatchEvent, ProductId, WarehouseId};

    use super::helpers::*;

    #[test]
    fn subscribers_see_every_event_in_order() {
        let d = site();
        let rx = d.subscribe();
        let id = transfer(&d, 10);
        d.optimize_schedule().unwrap();
        d.execute(&id).unwrap();

        let names: Vec<_> = rx.try_iter().map(|e| e.name()).collect();
        assert_eq!(names.first(), Some(&"task_created"));
        assert!(names.contains(&"task_assigned"));
        assert_eq!(names.last(), Some(&"equipment_status_changed"));
        // Everything but the fixture's hitch.
        assert_eq!(names.len() as u64 + 1, d.total_events());
    }

    #[test]
    fn dropped_subscribers_are_forgotten() {
        let d = site();
        drop(d.subscribe());
        transfer(&d, 10);
        assert_eq!(d.total_events(), 2);
    }

    #[test]
    fn recent_events_page_newest_first() {
        let d = site();
        for _ in 0..3 {
            d.adjust_stock(&WarehouseId::new("TW001"), &ProductId::new("P001"), -1).unwrap();
        }
        let newest = d.recent_events(0, 1);
        assert!(matches!(newest[0], DispatchEvent::StockAdjusted { quantity: 97, .. }));
        let rest = d.recent_events(1, 10);
        assert_eq!(rest.len(), 3);
        assert!(matches!(rest[1], DispatchEvent::StockAdjusted { quantity: 99, .. }));
        assert!(matches!(rest[2], DispatchEvent::FrameAttached { .. }));
        assert!(d.recent_events(4, 10).is_empty());
    }

    #[test]
    fn the_log_is_bounded() {
        let config = DispatchConfig { event_log_capacity: 2, ..DispatchConfig::with_grid(20, 20) };
        let d = site_with(config);
        for _ in 0..5 {
            d.adjust_stock(&WarehouseId::new("TW001"), &ProductId::new("P001"), 1).unwrap();
        }
        assert_eq!(d.recent_events(0, 10).len(), 2);
        assert_eq!(d.total_events(), 6);
    }

    #[test]
    fn failed_stock_adjustment_leaves_stock_alone() {
        let d = site();
        let err = d.adjust_stock(&WarehouseId::new("TW002"), &ProductId::new("P001"), 60).unwrap_err();
        assert_eq!(err.kind(), tms_core::ErrorKind::InsufficientCapacity);
        assert_eq!(stock(&d, "TW002", "P001"), 0);
        assert_eq!(d.total_events(), 1);
    }
}

// ── Reports ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod reports {
    use tms_core::TaskKind;

    use super::helpers::*;

    #[test]
    fn status_counts_entities_and_utilisation() {
        let d = site();
        let id = transfer(&d, 10);
        load(&d, 5, 1);
        d.assign_equipment(&id, &[eq("T001")]).unwrap();

        let status = d.status();
        assert_eq!((status.products, status.warehouses, status.equipment), (2, 3, 4));
        assert_eq!(status.active_tasks, 1);
        assert_eq!(status.pending_tasks, 1);
        assert_eq!(status.by_status.assigned, 1);
        assert_eq!(status.by_status.idle, 3);

        let tw001 = status.utilization.iter().find(|u| u.id == wh("TW001")).unwrap();
        assert!((tw001.utilization_pct - 10.0).abs() < 1e-9);
        assert!((tw001.available - 900.0).abs() < 1e-9);
    }

    #[test]
    fn success_rate_ignores_cancelled_tasks() {
        let d = site();
        assert_eq!(d.performance_report().success_rate, None);

        let ok = transfer(&d, 10);
        d.assign_equipment(&ok, &[eq("T001")]).unwrap();
        assert!(d.execute(&ok).unwrap());

        let bad = transfer(&d, 60);
        d.assign_equipment(&bad, &[eq("T001")]).unwrap();
        assert!(!d.execute(&bad).unwrap());

        let dropped = load(&d, 1, 1);
        d.cancel_task(&dropped).unwrap();

        let report = d.performance_report();
        assert_eq!((report.total, report.completed, report.failed, report.cancelled), (3, 1, 1, 1));
        assert_eq!(report.success_rate, Some(0.5));
        assert_eq!(report.average_execution_ticks, Some(16.0));

        let transfers = report.per_kind[&TaskKind::InternalTransfer];
        assert_eq!((transfers.total, transfers.completed, transfers.failed), (2, 1, 1));
        assert_eq!(report.per_kind[&TaskKind::Load].total, 1);

        let truck = report.equipment.iter().find(|e| e.id == eq("T001")).unwrap();
        assert_eq!(truck.busy_ticks, 16);
        assert_eq!(truck.utilization, Some(1.0));
        assert!(report.recent_events.len() <= crate::report::REPORT_RECENT_EVENTS);
    }
}

// ── Shared across threads ─────────────────────────────────────────────────────

#[cfg(test)]
mod threads {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::thread;

    use tms_core::{EquipmentId, ErrorKind, ProductId, TaskId, TaskStatus};

    use super::helpers::*;
    use crate::Dispatcher;

    /// No unit serves two live tasks and no warehouse is over capacity.
    fn assert_consistent(d: &Dispatcher) {
        let snap = d.snapshot();
        snap.validate().unwrap();

        let mut holders: BTreeMap<&EquipmentId, &TaskId> = BTreeMap::new();
        for task in snap.board.iter().filter(|t| t.status.is_in_flight()) {
            for id in &task.equipment {
                if let Some(other) = holders.insert(id, &task.id) {
                    panic!("{id} is on both {other} and {}", task.id);
                }
            }
        }
        for w in snap.registry.warehouses() {
            let load = snap.registry.warehouse_load(&w.id).unwrap();
            assert!(load <= w.capacity + 1e-9, "{} holds {load} of {}", w.id, w.capacity);
        }
    }

    #[test]
    fn planners_executors_and_stock_edits_share_one_dispatcher() {
        let d = Arc::new(site());
        second_truck(&d);

        thread::scope(|s| {
            for _ in 0..2 {
                let d = Arc::clone(&d);
                s.spawn(move || {
                    for i in 0..25u64 {
                        transfer(&d, 5 + i % 10);
                        load(&d, 3, (i % 4) as i32);
                        d.optimize_schedule().unwrap();
                        assert_consistent(&d);
                    }
                });
            }
            for _ in 0..2 {
                let d = Arc::clone(&d);
                s.spawn(move || {
                    for _ in 0..50 {
                        for task in d.tasks_with_status(TaskStatus::Assigned) {
                            // Another executor may have got there first.
                            if let Err(e) = d.execute(&task.id) {
                                assert_eq!(e.kind(), ErrorKind::InvalidTransition);
                            }
                        }
                        assert_consistent(&d);
                        thread::yield_now();
                    }
                });
            }
            let d = Arc::clone(&d);
            s.spawn(move || {
                let p001 = ProductId::new("P001");
                for i in 0..100 {
                    let delta = if i % 2 == 0 { 7 } else { -7 };
                    if let Err(e) = d.adjust_stock(&wh("TW002"), &p001, delta) {
                        assert!(matches!(e.kind(), ErrorKind::InsufficientCapacity | ErrorKind::NegativeStock));
                    }
                    if i % 10 == 0 {
                        d.adjust_stock(&wh("TW001"), &p001, 5).unwrap();
                    }
                    assert_consistent(&d);
                }
            });
        });

        for task in d.tasks_with_status(TaskStatus::Assigned) {
            d.execute(&task.id).unwrap();
        }
        assert_consistent(&d);
        assert!(d.fleet().iter().all(|e| e.current_task.is_none()));
        assert!(d.tasks().iter().all(|t| t.status.is_terminal() || t.status == TaskStatus::Pending));
        assert_eq!(d.tasks().len(), 100);
    }
}

// ── Snapshots ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod snapshot {
    use tms_core::{DispatchConfig, ErrorKind, Position, TaskId};

    use super::helpers::*;
    use crate::{DispatcherBuilder, Snapshot};

    #[test]
    fn json_round_trip_restores_the_site() {
        let d = site();
        d.set_obstacle(Position::new(3, 3), true).unwrap();
        let id = transfer(&d, 10);
        d.optimize_schedule().unwrap();
        d.execute(&id).unwrap();
        load(&d, 5, 2);

        let json = serde_json::to_string(&d.snapshot()).unwrap();
        let snap: Snapshot = serde_json::from_str(&json).unwrap();
        let restored = DispatcherBuilder::new(DispatchConfig::default()).restore(snap).build().unwrap();

        assert_eq!(restored.snapshot(), d.snapshot());
        assert_eq!(restored.now(), d.now());
        assert!(restored.is_blocked(Position::new(3, 3)).unwrap());

        // Id generation carries on where it left off.
        let next = transfer(&restored, 1);
        assert_eq!(next, TaskId::new("T000003"));
    }

    #[test]
    fn in_flight_task_must_hold_every_unit_it_lists() {
        let d = site();
        let id = transfer(&d, 10);
        d.optimize_schedule().unwrap();
        d.snapshot().validate().unwrap();

        let mut snap = d.snapshot();
        snap.registry.release_equipment(&eq("T001"), d.now()).unwrap();
        let err = snap.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert!(err.to_string().contains(id.as_str()));
        assert!(DispatcherBuilder::new(DispatchConfig::default()).restore(snap).build().is_err());
    }

    #[test]
    fn mismatched_grid_is_rejected() {
        let d = site();
        let mut snap = d.snapshot();
        snap.config.grid_width = 30;
        let err = DispatcherBuilder::new(DispatchConfig::default()).restore(snap).build().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn extra_obstacles_may_not_cover_entities() {
        let snap = site().snapshot();
        let err = DispatcherBuilder::new(DispatchConfig::default())
            .restore(snap)
            .obstacles([Position::new(0, 0)])
            .build()
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = DispatchConfig { ticks_per_move: 0, ..DispatchConfig::default() };
        let err = DispatcherBuilder::new(config).build().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
