//! Merge per-source event lists into one chronological timeline.

use crate::types::Event;

/// Merge event lists and sort by time, then by source priority
/// (logs, traces, cluster, metrics). The sort is stable, so events with equal
/// time and source keep their payload order.
pub fn build<I>(lists: I) -> Vec<Event>
where
  I: IntoIterator<Item = Vec<Event>>,
{
  let mut timeline: Vec<Event> = lists.into_iter().flatten().collect();
  timeline.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.source.cmp(&b.source)));
  timeline
}

pub fn is_sorted(timeline: &[Event]) -> bool {
  timeline.windows(2).all(|w| w[0].time <= w[1].time)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::Source;
  use chrono::{DateTime, TimeZone, Utc};

  fn at(sec: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, sec).unwrap()
  }

  fn ev(sec: u32, source: Source, msg: &str) -> Event {
    Event::new(at(sec), source, msg)
  }

  #[test]
  fn merges_chronologically() {
    let logs = vec![ev(5, Source::Logs, "l5"), ev(1, Source::Logs, "l1")];
    let traces = vec![ev(3, Source::Traces, "t3")];
    let cluster = vec![ev(2, Source::Cluster, "c2")];

    let timeline = build([logs, traces, cluster]);
    let order: Vec<&str> = timeline.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(order, ["l1", "c2", "t3", "l5"]);
    assert!(is_sorted(&timeline));
  }

  #[test]
  fn ties_break_by_source_priority() {
    let timeline = build([
      vec![ev(1, Source::Metrics, "m")],
      vec![ev(1, Source::Cluster, "c")],
      vec![ev(1, Source::Traces, "t")],
      vec![ev(1, Source::Logs, "l")],
    ]);
    let order: Vec<Source> = timeline.iter().map(|e| e.source).collect();
    assert_eq!(order, [Source::Logs, Source::Traces, Source::Cluster, Source::Metrics]);
  }

  #[test]
  fn exact_ties_keep_payload_order() {
    let timeline = build([vec![ev(1, Source::Logs, "first"), ev(1, Source::Logs, "second")]]);
    assert_eq!(timeline[0].message, "first");
    assert_eq!(timeline[1].message, "second");
  }

  #[test]
  fn empty_input() {
    assert!(build(Vec::<Vec<Event>>::new()).is_empty());
  }
}
