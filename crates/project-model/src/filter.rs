//! Narrowing an event set to the events selected for rendering.

use std::collections::BTreeSet;

use crate::event::{Event, EventId};

/// Identifier and room restrictions. An absent (or empty) set does not restrict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub ids: Option<BTreeSet<EventId>>,
    pub rooms: Option<BTreeSet<String>>,
}

/// How an [`EventFilter`] treats one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Selected,
    /// Passed the id filter but not the room filter. Reported to the
    /// operator rather than dropped silently.
    RoomMismatch,
    Excluded,
}

/// Result of applying an [`EventFilter`]: every event that passed the id
/// filter, in input order, with its verdict.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    pub entries: Vec<(Event, Selection)>,
}

impl FilterOutcome {
    pub fn selected(&self) -> impl Iterator<Item = &Event> {
        self.with(Selection::Selected)
    }

    pub fn room_mismatches(&self) -> impl Iterator<Item = &Event> {
        self.with(Selection::RoomMismatch)
    }

    /// Events that passed the id filter.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn with(&self, wanted: Selection) -> impl Iterator<Item = &Event> {
        self.entries
            .iter()
            .filter(move |(_, selection)| *selection == wanted)
            .map(|(event, _)| event)
    }
}

impl EventFilter {
    pub fn new(
        ids: impl IntoIterator<Item = EventId>,
        rooms: impl IntoIterator<Item = String>,
    ) -> Self {
        let ids: BTreeSet<_> = ids.into_iter().collect();
        let rooms: BTreeSet<_> = rooms.into_iter().collect();
        Self {
            ids: (!ids.is_empty()).then_some(ids),
            rooms: (!rooms.is_empty()).then_some(rooms),
        }
    }

    pub fn matches_id(&self, event: &Event) -> bool {
        match &self.ids {
            Some(ids) if !ids.is_empty() => ids.contains(&event.id),
            _ => true,
        }
    }

    /// An event without a room never matches a room restriction.
    pub fn matches_room(&self, event: &Event) -> bool {
        match &self.rooms {
            Some(rooms) if !rooms.is_empty() => {
                event.room().is_some_and(|room| rooms.contains(room))
            }
            _ => true,
        }
    }

    pub fn classify(&self, event: &Event) -> Selection {
        if !self.matches_id(event) {
            Selection::Excluded
        } else if self.matches_room(event) {
            Selection::Selected
        } else {
            Selection::RoomMismatch
        }
    }

    /// Apply both restrictions, preserving input order.
    pub fn apply<I>(&self, events: I) -> FilterOutcome
    where
        I: IntoIterator<Item = Event>,
    {
        let entries = events
            .into_iter()
            .filter_map(|event| match self.classify(&event) {
                Selection::Excluded => None,
                selection => Some((event, selection)),
            })
            .collect();
        FilterOutcome { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ReservedJob;
    use proptest::prelude::*;

    fn talk(id: u64, room: &str) -> Event {
        Event::new(EventId::Talk(id), format!("Talk {id}")).with_field("room", room)
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let events = vec![talk(1, "A"), Event::reserved(ReservedJob::Pause)];
        let outcome = EventFilter::default().apply(events.clone());
        assert_eq!(outcome.selected().cloned().collect::<Vec<_>>(), events);
        assert_eq!(outcome.room_mismatches().count(), 0);
    }

    #[test]
    fn test_room_mismatch_is_reported() {
        let filter = EventFilter::new([], ["A".to_string()]);
        let outcome = filter.apply(vec![talk(1, "A"), talk(2, "B"), talk(3, "A")]);
        let ids: Vec<_> = outcome.selected().map(|e| e.id).collect();
        assert_eq!(ids, vec![EventId::Talk(1), EventId::Talk(3)]);
        let mismatched: Vec<_> = outcome.room_mismatches().map(|e| e.id).collect();
        assert_eq!(mismatched, vec![EventId::Talk(2)]);
    }

    #[test]
    fn test_mismatches_keep_their_place_in_input_order() {
        let filter = EventFilter::new([], ["A".to_string()]);
        let outcome = filter.apply(vec![talk(1, "B"), talk(2, "A"), talk(3, "C"), talk(4, "A")]);
        let order: Vec<_> = outcome.entries.iter().map(|(e, s)| (e.id, *s)).collect();
        assert_eq!(
            order,
            vec![
                (EventId::Talk(1), Selection::RoomMismatch),
                (EventId::Talk(2), Selection::Selected),
                (EventId::Talk(3), Selection::RoomMismatch),
                (EventId::Talk(4), Selection::Selected),
            ]
        );
    }

    #[test]
    fn test_id_mismatch_is_not_reported_as_room_mismatch() {
        let filter = EventFilter::new([EventId::Talk(1)], ["A".to_string()]);
        let outcome = filter.apply(vec![talk(1, "A"), talk(2, "B")]);
        assert_eq!(outcome.len(), 1);
        assert_eq!(outcome.room_mismatches().count(), 0);
        assert_eq!(filter.classify(&talk(2, "B")), Selection::Excluded);
    }

    #[test]
    fn test_event_without_room_fails_room_filter() {
        let filter = EventFilter::new([], ["A".to_string()]);
        let outcome = filter.apply(vec![Event::reserved(ReservedJob::Outro)]);
        assert_eq!(outcome.selected().count(), 0);
        assert_eq!(outcome.room_mismatches().count(), 1);
    }

    #[test]
    fn test_empty_sets_collapse_to_none() {
        let filter = EventFilter::new(Vec::<EventId>::new(), Vec::<String>::new());
        assert_eq!(filter, EventFilter::default());
        assert!(filter.apply(Vec::new()).is_empty());
    }

    fn arb_events() -> impl Strategy<Value = Vec<Event>> {
        proptest::collection::btree_map(1u64..40, 0usize..4, 0..20).prop_map(|by_id| {
            by_id
                .into_iter()
                .map(|(id, room)| talk(id, ["A", "B", "C", "D"][room]))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_filter_equals_set_comprehension(
            events in arb_events(),
            ids in proptest::collection::btree_set(1u64..40, 0..6),
            rooms in proptest::collection::btree_set(prop_oneof![Just("A"), Just("B"), Just("C")], 0..3),
        ) {
            let id_set: BTreeSet<EventId> = ids.iter().copied().map(EventId::Talk).collect();
            let room_set: BTreeSet<String> = rooms.iter().map(|r| r.to_string()).collect();
            let filter = EventFilter::new(id_set.clone(), room_set.clone());

            let expected: Vec<Event> = events
                .iter()
                .filter(|e| id_set.is_empty() || id_set.contains(&e.id))
                .filter(|e| room_set.is_empty() || e.room().is_some_and(|r| room_set.contains(r)))
                .cloned()
                .collect();

            let outcome = filter.apply(events.clone());
            prop_assert_eq!(outcome.selected().cloned().collect::<Vec<_>>(), expected);
        }
    }
}
