//! Scheduler: policy-dependent selection of the next PCB to run.

use crate::config::SchedulingPolicy;
use crate::pcb::PcbTable;

/// Selects the next process to run according to `policy`.
///
/// Returns `None` if no process is currently READY or NEW. SJF-N and
/// SRTF-P select by minimum `total_time`/`time_remaining` respectively
/// (ties broken by table order, i.e. FCFS); every other policy selects
/// the first READY/NEW process in table order.
#[must_use]
pub fn select_next(table: &PcbTable, policy: SchedulingPolicy) -> Option<u32> {
    match policy {
        SchedulingPolicy::SjfN => table.find_min_by(|p| p.total_time),
        SchedulingPolicy::SrtfP => table.find_min_by(|p| p.time_remaining),
        SchedulingPolicy::FcfsN | SchedulingPolicy::FcfsP | SchedulingPolicy::RrP => {
            table.find_next_ready_linear()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcb::{Pcb, ProcessState};

    fn ready_pcb(id: u32, total_time: i64, time_remaining: i64) -> Pcb {
        let mut pcb = Pcb::new(id, id, 0);
        pcb.state = ProcessState::Ready;
        pcb.total_time = total_time;
        pcb.time_remaining = time_remaining;
        pcb
    }

    #[test]
    fn fcfs_n_picks_first_ready_in_table_order() {
        let mut table = PcbTable::new();
        table.append(ready_pcb(0, 100, 100));
        table.append(ready_pcb(1, 10, 10));
        assert_eq!(select_next(&table, SchedulingPolicy::FcfsN), Some(0));
    }

    #[test]
    fn sjf_n_picks_smallest_total_time() {
        let mut table = PcbTable::new();
        table.append(ready_pcb(0, 50, 50));
        table.append(ready_pcb(1, 20, 20));
        assert_eq!(select_next(&table, SchedulingPolicy::SjfN), Some(1));
    }

    #[test]
    fn srtf_p_picks_smallest_time_remaining() {
        let mut table = PcbTable::new();
        table.append(ready_pcb(0, 50, 30));
        table.append(ready_pcb(1, 20, 45));
        assert_eq!(select_next(&table, SchedulingPolicy::SrtfP), Some(0));
    }

    #[test]
    fn returns_none_when_nothing_ready() {
        let table = PcbTable::new();
        assert_eq!(select_next(&table, SchedulingPolicy::RrP), None);
    }
}
