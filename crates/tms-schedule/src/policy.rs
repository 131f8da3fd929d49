//! Task ordering.  Each policy is a total order: the creation sequence is
//! always the last key, and no two tasks share one.

use std::cmp::Ordering;

use tms_core::{SchedulingPolicy, Tick};
use tms_task::Task;

/// Deadline ascending with "no deadline" last.
fn by_deadline(a: Option<Tick>, b: Option<Tick>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None)    => Ordering::Less,
        (None, Some(_))    => Ordering::Greater,
        (None, None)       => Ordering::Equal,
    }
}

/// `Less` means `a` runs first.
pub fn compare(a: &Task, b: &Task, policy: SchedulingPolicy) -> Ordering {
    let key = match policy {
        SchedulingPolicy::PriorityDeadline => b
            .priority
            .cmp(&a.priority)
            .then_with(|| by_deadline(a.deadline, b.deadline)),
        SchedulingPolicy::EarliestDeadline => by_deadline(a.deadline, b.deadline)
            .then_with(|| b.priority.cmp(&a.priority)),
        SchedulingPolicy::Fifo => Ordering::Equal,
    };
    key.then_with(|| a.seq.cmp(&b.seq))
}

/// Sort `tasks` into run order.
pub fn order_tasks(tasks: &mut [&Task], policy: SchedulingPolicy) {
    tasks.sort_by(|a, b| compare(a, b, policy));
}
