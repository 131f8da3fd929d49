//! Unit tests for tms-schedule.

#[cfg(test)]
mod helpers {
    use tms_core::{Connectivity, Position, TaskId, Tick};
    use tms_registry::{Equipment, EquipmentKind, Product, Registry, Warehouse, WarehouseKind};
    use tms_spatial::Grid;
    use tms_task::{ShipPlan, TaskBoard, TaskDraft, TaskSpec};

    pub fn grid() -> Grid {
        Grid::new(20, 20, Connectivity::Four)
    }

    /// TW001 at (0,0) with 100 × P001 (weight 1); PW001 at (10,10) with
    /// 50 × P003 (weight 5); TW002 empty at (0,10).
    pub fn registry() -> Registry {
        let mut r = Registry::new();
        r.add_product(Product::new("P001", "steel", 1.0, 1.0)).unwrap();
        r.add_product(Product::new("P003", "timber", 5.0, 8.0)).unwrap();
        r.add_warehouse(
            Warehouse::new("TW001", "terminal", WarehouseKind::Terminal, Position::new(0, 0), 1000.0)
                .with_stock("P001", 100),
        )
        .unwrap();
        r.add_warehouse(
            Warehouse::new("PW001", "goods", WarehouseKind::FinishedGoods, Position::new(10, 10), 2000.0)
                .with_stock("P003", 50),
        )
        .unwrap();
        r.add_warehouse(Warehouse::new("TW002", "terminal 2", WarehouseKind::Terminal, Position::new(0, 10), 1000.0))
            .unwrap();
        r
    }

    pub fn crane(r: &mut Registry, id: &str, at: (i32, i32), home: &str) {
        r.add_equipment(Equipment::new(id, id, EquipmentKind::Crane, at.into()).with_home(home)).unwrap();
    }

    pub fn bare_truck(r: &mut Registry, id: &str, at: (i32, i32), capacity: f64) {
        r.add_equipment(Equipment::new(id, id, EquipmentKind::FrameTruck, at.into()).with_capacity(capacity))
            .unwrap();
    }

    /// Truck `id` towing frame `<id>-F`, rated `frame_capacity`.
    pub fn hitched(r: &mut Registry, id: &str, at: (i32, i32), capacity: f64, frame_capacity: f64) {
        bare_truck(r, id, at, capacity);
        let frame = format!("{id}-F");
        r.add_equipment(Equipment::new(frame.as_str(), "frame", EquipmentKind::Frame, at.into()).with_capacity(frame_capacity))
            .unwrap();
        r.attach_frame(&id.into(), &frame.as_str().into(), Tick::ZERO).unwrap();
    }

    /// Truck and frame both rated `capacity`.
    pub fn truck(r: &mut Registry, id: &str, at: (i32, i32), capacity: f64) {
        hitched(r, id, at, capacity, capacity);
    }

    pub fn load(board: &mut TaskBoard, warehouse: &str, qty: u64, priority: i32) -> TaskId {
        let draft = TaskDraft::new(TaskSpec::Load { warehouse: warehouse.into() })
            .with_product("P001", qty)
            .with_priority(priority);
        board.create(draft, Tick::ZERO).unwrap().0
    }

    pub fn transfer(board: &mut TaskBoard, qty: u64) -> TaskId {
        let draft = TaskDraft::new(TaskSpec::InternalTransfer { source: "TW001".into(), target: "TW002".into() })
            .with_product("P001", qty);
        board.create(draft, Tick::ZERO).unwrap().0
    }

    pub fn ship(board: &mut TaskBoard, qty: u64) -> TaskId {
        let draft = TaskDraft::new(TaskSpec::ShipTransport {
            plan:   ShipPlan::new("MV Star", "Shanghai"),
            source: "PW001".into(),
        })
        .with_product("P003", qty);
        board.create(draft, Tick::ZERO).unwrap().0
    }
}

// ── Ordering ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod ordering {
    use tms_core::{SchedulingPolicy, Tick};
    use tms_task::{Task, TaskBoard};

    use super::helpers::load;
    use crate::order_tasks;

    fn ordered(board: &TaskBoard, policy: SchedulingPolicy) -> Vec<i32> {
        let mut tasks: Vec<&Task> = board.iter().collect();
        order_tasks(&mut tasks, policy);
        tasks.iter().map(|t| t.priority).collect()
    }

    #[test]
    fn priority_descending() {
        let mut board = TaskBoard::new();
        for p in [1, 5, 3] {
            load(&mut board, "TW001", 1, p);
        }
        assert_eq!(ordered(&board, SchedulingPolicy::PriorityDeadline), vec![5, 3, 1]);
    }

    #[test]
    fn deadline_breaks_priority_ties_with_none_last() {
        let mut board = TaskBoard::new();
        let a = load(&mut board, "TW001", 1, 2);
        let b = load(&mut board, "TW001", 1, 2);
        let c = load(&mut board, "TW001", 1, 2);
        board.get_mut(&b).unwrap().deadline = Some(Tick(50));
        board.get_mut(&c).unwrap().deadline = Some(Tick(10));

        let mut tasks: Vec<&Task> = board.iter().collect();
        order_tasks(&mut tasks, SchedulingPolicy::PriorityDeadline);
        let ids: Vec<_> = tasks.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec![c, b, a]);
    }

    #[test]
    fn creation_order_is_the_last_key() {
        let mut board = TaskBoard::new();
        let first = load(&mut board, "TW001", 1, 1);
        let second = load(&mut board, "TW001", 1, 1);
        let mut tasks: Vec<&Task> = board.iter().collect();
        tasks.reverse();
        order_tasks(&mut tasks, SchedulingPolicy::PriorityDeadline);
        assert_eq!(tasks[0].id, first);
        assert_eq!(tasks[1].id, second);
    }

    #[test]
    fn earliest_deadline_ignores_priority_first() {
        let mut board = TaskBoard::new();
        let urgent = load(&mut board, "TW001", 1, 9);
        let soon = load(&mut board, "TW001", 1, 1);
        board.get_mut(&soon).unwrap().deadline = Some(Tick(5));
        let mut tasks: Vec<&Task> = board.iter().collect();
        order_tasks(&mut tasks, SchedulingPolicy::EarliestDeadline);
        assert_eq!(tasks[0].id, soon);
        assert_eq!(tasks[1].id, urgent);
    }

    #[test]
    fn fifo_is_creation_order() {
        let mut board = TaskBoard::new();
        for p in [1, 5, 3] {
            load(&mut board, "TW001", 1, p);
        }
        assert_eq!(ordered(&board, SchedulingPolicy::Fifo), vec![1, 5, 3]);
    }
}

// ── Assignment ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod assignment {
    use std::collections::BTreeSet;

    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use tms_core::{EquipmentId, Position, SchedulingPolicy, Tick};
    use tms_registry::WarehouseUpdate;
    use tms_spatial::AStarRouter;
    use tms_task::TaskBoard;

    use super::helpers::*;
    use crate::{optimize_schedule, projected_ledger};

    const POLICY: SchedulingPolicy = SchedulingPolicy::PriorityDeadline;

    #[test]
    fn single_crane_goes_to_higher_priority() {
        let mut r = registry();
        crane(&mut r, "C001", (0, 1), "TW001");
        let mut board = TaskBoard::new();
        let low = load(&mut board, "TW001", 5, 1);
        let high = load(&mut board, "TW001", 5, 3);

        let s = optimize_schedule(board.iter(), &r, &grid(), &AStarRouter, POLICY);
        assert_eq!(s.order(), vec![high]);
        assert_eq!(s.assignments[0].equipment, vec![EquipmentId::new("C001")]);
        assert_eq!(s.deferred.len(), 1);
        assert_eq!(s.deferred[0].task, low);
    }

    #[test]
    fn nearest_by_route_not_by_straight_line() {
        let mut r = registry();
        truck(&mut r, "T001", (2, 0), 100.0);
        truck(&mut r, "T002", (0, 4), 100.0);
        // Wall at x = 1 for y in 0..5: T001 must go round the top (12 moves).
        let mut g = grid();
        for y in 0..5 {
            g.set_obstacle(Position::new(1, y), true).unwrap();
        }
        let mut board = TaskBoard::new();
        transfer(&mut board, 10);

        let s = optimize_schedule(board.iter(), &r, &g, &AStarRouter, POLICY);
        assert_eq!(s.assignments[0].equipment, vec![EquipmentId::new("T002")]);
        assert_eq!(s.assignments[0].approach_moves, 4);
    }

    #[test]
    fn equal_distance_goes_to_lowest_id() {
        let mut r = registry();
        truck(&mut r, "T009", (3, 0), 100.0);
        truck(&mut r, "T002", (0, 3), 100.0);
        let mut board = TaskBoard::new();
        transfer(&mut board, 10);
        let s = optimize_schedule(board.iter(), &r, &grid(), &AStarRouter, POLICY);
        assert_eq!(s.assignments[0].equipment, vec![EquipmentId::new("T002")]);
    }

    #[test]
    fn undersized_truck_is_skipped() {
        let mut r = registry();
        truck(&mut r, "T001", (0, 1), 5.0);
        truck(&mut r, "T002", (9, 9), 50.0);
        let mut board = TaskBoard::new();
        transfer(&mut board, 10);
        let s = optimize_schedule(board.iter(), &r, &grid(), &AStarRouter, POLICY);
        assert_eq!(s.assignments[0].equipment, vec![EquipmentId::new("T002")]);
    }

    #[test]
    fn crane_must_be_at_the_site() {
        let mut r = registry();
        crane(&mut r, "C002", (10, 11), "PW001");
        let mut board = TaskBoard::new();
        load(&mut board, "TW001", 5, 1);
        let s = optimize_schedule(board.iter(), &r, &grid(), &AStarRouter, POLICY);
        assert!(s.is_empty());
        assert_eq!(s.deferred.len(), 1);
    }

    #[test]
    fn ship_transport_takes_crane_and_truck() {
        let mut r = registry();
        crane(&mut r, "C001", (0, 1), "TW001");
        crane(&mut r, "C002", (10, 11), "PW001");
        truck(&mut r, "T001", (5, 5), 100.0);
        let mut board = TaskBoard::new();
        ship(&mut board, 20);
        let s = optimize_schedule(board.iter(), &r, &grid(), &AStarRouter, POLICY);
        assert_eq!(s.assignments[0].equipment, vec![EquipmentId::new("C002"), EquipmentId::new("T001")]);
        assert_eq!(s.assignments[0].approach_moves, 10);
    }

    #[test]
    fn partial_crews_release_their_picks() {
        let mut r = registry();
        crane(&mut r, "C002", (10, 11), "PW001");
        // Too small for 20 × 5 t.
        truck(&mut r, "T001", (5, 5), 50.0);
        let mut board = TaskBoard::new();
        let shipment = ship(&mut board, 20);
        let lift = {
            let draft = tms_task::TaskDraft::new(tms_task::TaskSpec::Load { warehouse: "PW001".into() })
                .with_product("P003", 2);
            board.create(draft, tms_core::Tick::ZERO).unwrap().0
        };
        let s = optimize_schedule(board.iter(), &r, &grid(), &AStarRouter, POLICY);
        assert_eq!(s.deferred[0].task, shipment);
        assert_eq!(s.order(), vec![lift]);
    }

    #[test]
    fn projected_stock_defers_overdraw() {
        let mut r = registry();
        truck(&mut r, "T001", (0, 1), 100.0);
        truck(&mut r, "T002", (1, 0), 100.0);
        let mut board = TaskBoard::new();
        let first = transfer(&mut board, 60);
        let second = transfer(&mut board, 60);
        let s = optimize_schedule(board.iter(), &r, &grid(), &AStarRouter, POLICY);
        assert_eq!(s.order(), vec![first]);
        assert_eq!(s.deferred[0].task, second);
    }

    #[test]
    fn trucks_haul_only_with_a_big_enough_frame() {
        let mut r = registry();
        bare_truck(&mut r, "T001", (0, 1), 100.0);
        hitched(&mut r, "T002", (1, 0), 100.0, 5.0);
        hitched(&mut r, "T003", (9, 9), 100.0, 80.0);
        let mut board = TaskBoard::new();
        transfer(&mut board, 10);
        let s = optimize_schedule(board.iter(), &r, &grid(), &AStarRouter, POLICY);
        assert_eq!(s.assignments[0].equipment, vec![EquipmentId::new("T003")]);
    }

    #[test]
    fn earlier_assignments_keep_their_stock_claims() {
        let mut r = registry();
        r.update_warehouse(&"TW002".into(), &WarehouseUpdate { capacity: Some(50.0), ..Default::default() })
            .unwrap();
        truck(&mut r, "T001", (0, 1), 100.0);
        truck(&mut r, "T002", (1, 0), 100.0);
        let mut board = TaskBoard::new();

        let first = transfer(&mut board, 40);
        let s = optimize_schedule(board.iter(), &r, &grid(), &AStarRouter, POLICY);
        assert_eq!(s.order(), vec![first.clone()]);
        let crew = s.assignments[0].equipment.clone();
        for e in &crew {
            r.reserve_equipment(e, &first, Tick::ZERO).unwrap();
        }
        board.get_mut(&first).unwrap().assign(crew, Tick::ZERO).unwrap();

        // 40 t more would put TW002 at 80 of 50 once both run.
        let second = transfer(&mut board, 40);
        let s = optimize_schedule(board.iter(), &r, &grid(), &AStarRouter, POLICY);
        assert!(s.is_empty());
        assert_eq!(s.deferred[0].task, second);
        assert!(s.deferred[0].reason.contains("TW002"), "{}", s.deferred[0].reason);

        let ledger = projected_ledger(board.iter(), &r);
        assert_eq!(ledger.warehouse_load(&"TW002".into()).unwrap(), 40.0);
        assert_eq!(r.warehouse_load(&"TW002".into()).unwrap(), 0.0);
    }

    #[test]
    fn unreachable_equipment_is_not_eligible() {
        let mut r = registry();
        truck(&mut r, "T001", (19, 19), 100.0);
        let mut g = grid();
        g.set_obstacle(Position::new(18, 19), true).unwrap();
        g.set_obstacle(Position::new(19, 18), true).unwrap();
        let mut board = TaskBoard::new();
        transfer(&mut board, 10);
        let s = optimize_schedule(board.iter(), &r, &g, &AStarRouter, POLICY);
        assert!(s.is_empty());
        assert_eq!(s.grid_version, 2);
    }

    #[test]
    fn non_pending_tasks_are_ignored() {
        let mut r = registry();
        truck(&mut r, "T001", (0, 1), 100.0);
        let mut board = TaskBoard::new();
        let id = transfer(&mut board, 10);
        board.get_mut(&id).unwrap().cancel(tms_core::Tick::ZERO).unwrap();
        let s = optimize_schedule(board.iter(), &r, &grid(), &AStarRouter, POLICY);
        assert!(s.is_empty() && s.deferred.is_empty());
    }

    #[test]
    fn random_workloads_never_double_book() {
        for seed in [3_u64, 17, 42] {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut r = registry();
            for i in 0..4 {
                crane(&mut r, &format!("C{i:03}"), (rng.gen_range(0..20), rng.gen_range(0..20)), "TW001");
                truck(&mut r, &format!("T{i:03}"), (rng.gen_range(0..20), rng.gen_range(0..20)), 100.0);
            }
            let mut board = TaskBoard::new();
            for _ in 0..12 {
                match rng.gen_range(0..3) {
                    0 => load(&mut board, "TW001", rng.gen_range(1..10), rng.gen_range(0..5)),
                    1 => transfer(&mut board, rng.gen_range(1..30)),
                    _ => ship(&mut board, rng.gen_range(1..5)),
                };
            }
            let s = optimize_schedule(board.iter(), &r, &grid(), &AStarRouter, POLICY);
            let mut seen = BTreeSet::new();
            for a in &s.assignments {
                for e in &a.equipment {
                    assert!(seen.insert(e.clone()), "seed {seed}: {e} booked twice");
                }
            }
            assert_eq!(s.assignments.len() + s.deferred.len(), 12);

            // Same inputs, same answer.
            assert_eq!(s, optimize_schedule(board.iter(), &r, &grid(), &AStarRouter, POLICY));
        }
    }
}

// ── Manual crews ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod crews {
    use tms_core::{EquipmentId, ErrorKind, TaskId, Tick};
    use tms_registry::EquipmentUpdate;
    use tms_task::TaskBoard;

    use super::helpers::*;
    use crate::{ScheduleError, check_crew, verify_crew};

    fn ids(list: &[&str]) -> Vec<EquipmentId> {
        list.iter().map(|s| EquipmentId::new(*s)).collect()
    }

    #[test]
    fn crew_is_returned_in_requirement_order() {
        let mut r = registry();
        crane(&mut r, "C002", (10, 11), "PW001");
        truck(&mut r, "T001", (5, 5), 100.0);
        let mut board = TaskBoard::new();
        let id = ship(&mut board, 2);
        let task = board.get(&id).unwrap();
        assert_eq!(check_crew(task, &ids(&["T001", "C002"]), &r).unwrap(), ids(&["C002", "T001"]));
    }

    #[test]
    fn wrong_kind_is_unsupported() {
        let mut r = registry();
        crane(&mut r, "C001", (0, 1), "TW001");
        let mut board = TaskBoard::new();
        let id = transfer(&mut board, 5);
        let err = check_crew(board.get(&id).unwrap(), &ids(&["C001"]), &r).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn busy_unit_is_already_assigned() {
        let mut r = registry();
        truck(&mut r, "T001", (0, 1), 100.0);
        r.reserve_equipment(&EquipmentId::new("T001"), &TaskId::new("X"), Tick::ZERO).unwrap();
        let mut board = TaskBoard::new();
        let id = transfer(&mut board, 5);
        let err = check_crew(board.get(&id).unwrap(), &ids(&["T001"]), &r).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyAssigned);
    }

    #[test]
    fn missing_slot_is_invalid_and_undersized_is_capacity() {
        let mut r = registry();
        crane(&mut r, "C002", (10, 11), "PW001");
        truck(&mut r, "T001", (5, 5), 1.0);
        let mut board = TaskBoard::new();
        let id = ship(&mut board, 2);
        let task = board.get(&id).unwrap();
        assert_eq!(check_crew(task, &ids(&["C002"]), &r).unwrap_err().kind(), ErrorKind::Invalid);
        assert_eq!(
            check_crew(task, &ids(&["C002", "T001"]), &r).unwrap_err().kind(),
            ErrorKind::InsufficientCapacity
        );
        assert_eq!(check_crew(task, &ids(&["C002", "C002"]), &r).unwrap_err().kind(), ErrorKind::Invalid);
    }

    #[test]
    fn only_pending_tasks_take_crews() {
        let mut r = registry();
        truck(&mut r, "T001", (0, 1), 100.0);
        let mut board = TaskBoard::new();
        let id = transfer(&mut board, 5);
        board.get_mut(&id).unwrap().cancel(Tick::ZERO).unwrap();
        let err = check_crew(board.get(&id).unwrap(), &ids(&["T001"]), &r).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    #[test]
    fn unhitched_truck_is_refused() {
        let mut r = registry();
        bare_truck(&mut r, "T001", (0, 1), 100.0);
        let mut board = TaskBoard::new();
        let id = transfer(&mut board, 5);
        let err = check_crew(board.get(&id).unwrap(), &ids(&["T001"]), &r).unwrap_err();
        assert_eq!(err, ScheduleError::Unhitched(EquipmentId::new("T001")));
    }

    #[test]
    fn held_crew_is_rechecked_against_current_ratings() {
        let mut r = registry();
        crane(&mut r, "C001", (0, 1), "TW001");
        truck(&mut r, "T001", (0, 1), 100.0);
        let mut board = TaskBoard::new();
        let haul = transfer(&mut board, 40);
        let lift = load(&mut board, "TW001", 5, 1);
        board.get_mut(&haul).unwrap().assign(ids(&["T001"]), Tick::ZERO).unwrap();
        board.get_mut(&lift).unwrap().assign(ids(&["C001"]), Tick::ZERO).unwrap();
        verify_crew(board.get(&haul).unwrap(), &r).unwrap();
        verify_crew(board.get(&lift).unwrap(), &r).unwrap();

        let shrink = EquipmentUpdate { capacity: Some(10.0), ..Default::default() };
        r.update_equipment(&EquipmentId::new("T001"), &shrink).unwrap();
        let err = verify_crew(board.get(&haul).unwrap(), &r).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientCapacity);

        let rehome = EquipmentUpdate { home: Some(Some("PW001".into())), ..Default::default() };
        r.update_equipment(&EquipmentId::new("C001"), &rehome).unwrap();
        let err = verify_crew(board.get(&lift).unwrap(), &r).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn detached_frame_breaks_a_held_crew() {
        let mut r = registry();
        truck(&mut r, "T001", (0, 1), 100.0);
        let mut board = TaskBoard::new();
        let haul = transfer(&mut board, 5);
        board.get_mut(&haul).unwrap().assign(ids(&["T001"]), Tick::ZERO).unwrap();
        r.detach_frame(&EquipmentId::new("T001"), Tick::ZERO).unwrap();
        let err = verify_crew(board.get(&haul).unwrap(), &r).unwrap_err();
        assert_eq!(err, ScheduleError::Unhitched(EquipmentId::new("T001")));
    }
}
