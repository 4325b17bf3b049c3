use crate::policy::Role;
use std::cmp::Ordering;
use taskdesk_core::model::RecordId;

/// A developer considered for one ticket, enriched with project context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: RecordId,
    pub name: String,
    pub role: Role,
    /// Open tickets held in the ticket's project.
    pub open_tickets: u32,
    /// Touched an open ticket in the project within the recency window.
    pub recent: bool,
}

/// Most loaded first; equal loads by name (byte order), then id.
#[must_use]
pub fn ranking_order(a: &Candidate, b: &Candidate) -> Ordering {
    b.open_tickets
        .cmp(&a.open_tickets)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort candidates into suggestion order; the first entry is the default.
#[must_use]
pub fn rank(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(ranking_order);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn candidate(id: RecordId, name: &str, open_tickets: u32) -> Candidate {
        Candidate {
            id,
            name: name.to_string(),
            role: Role::Unknown,
            open_tickets,
            recent: false,
        }
    }

    fn names(ranked: &[Candidate]) -> Vec<&str> {
        ranked.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn heaviest_load_first() {
        let ranked = rank(vec![
            candidate(1, "Ann", 1),
            candidate(2, "Bob", 4),
            candidate(3, "Cy", 0),
        ]);
        assert_eq!(names(&ranked), vec!["Bob", "Ann", "Cy"]);
    }

    #[test]
    fn ties_break_by_name_regardless_of_input_order() {
        let forward = rank(vec![candidate(1, "Ann", 2), candidate(2, "Bob", 2)]);
        let backward = rank(vec![candidate(2, "Bob", 2), candidate(1, "Ann", 2)]);
        assert_eq!(names(&forward), vec!["Ann", "Bob"]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn name_comparison_is_bytewise() {
        let ranked = rank(vec![candidate(1, "bob", 1), candidate(2, "Zoe", 1)]);
        assert_eq!(names(&ranked), vec!["Zoe", "bob"]);
    }

    proptest! {
        #[test]
        fn ranking_is_input_order_independent(
            loads in proptest::collection::vec((0u32..5, "[A-D]{1,2}"), 1..12)
        ) {
            let candidates: Vec<Candidate> = loads
                .iter()
                .enumerate()
                .map(|(i, (load, name))| candidate(i as RecordId, name, *load))
                .collect();
            let mut reversed = candidates.clone();
            reversed.reverse();

            let ranked = rank(candidates);
            prop_assert_eq!(&ranked, &rank(reversed));
            for pair in ranked.windows(2) {
                prop_assert!(pair[0].open_tickets >= pair[1].open_tickets);
                if pair[0].open_tickets == pair[1].open_tickets {
                    prop_assert!(pair[0].name <= pair[1].name);
                }
            }
        }
    }
}
