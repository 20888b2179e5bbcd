//! Property tests for the distribution engine.

use chrono::Weekday;
use habitweek_core::{
    redistribute_all, ClockTime, Event, Habit, HabitDistributor, Placement, Recurrence, TimeInterval,
    User, WEEK,
};
use proptest::prelude::*;

fn interval(start: u16, len: u16) -> TimeInterval {
    let start = ClockTime::from_minutes(start).unwrap();
    TimeInterval::starting_at(start, len).unwrap()
}

fn arb_interval() -> impl Strategy<Value = TimeInterval> {
    (0u16..1380, 15u16..=240).prop_map(|(start, len)| interval(start, len.min(1440 - start)))
}

fn arb_event() -> impl Strategy<Value = Event> {
    (0usize..7, arb_interval()).prop_map(|(day, iv)| {
        Event::new("Busy", "egor", iv.start(), iv.end(), Recurrence::Weekly(WEEK[day]))
            .unwrap()
    })
}

fn arb_placement() -> impl Strategy<Value = Placement> {
    prop_oneof![
        Just(Placement::Free),
        prop::collection::vec(arb_interval(), 1..3).prop_map(Placement::Preferred),
        prop::collection::vec(arb_interval(), 1..3).prop_map(Placement::Fixed),
    ]
}

fn arb_user() -> impl Strategy<Value = User> {
    (
        prop::collection::vec(arb_event(), 0..20),
        prop::collection::vec((5u16..=300, arb_placement(), 1u32..=10), 1..6),
    )
        .prop_map(|(events, habits)| {
            let mut user = User::new("egor");
            user.events = events;
            for (i, (minutes, placement, times)) in habits.into_iter().enumerate() {
                let habit = Habit::new(format!("h{i}"), "egor", minutes, placement, times).unwrap();
                user.habits.push(habit);
            }
            user
        })
}

fn busy_on(user: &User, day: Weekday) -> (Vec<TimeInterval>, Vec<TimeInterval>) {
    let events = user
        .events
        .iter()
        .filter(|e| e.day() == day)
        .map(|e| e.interval)
        .collect();
    let placed = user
        .habits
        .iter()
        .flat_map(|h| h.occurrences.iter())
        .filter(|o| o.day == day)
        .map(|o| o.interval)
        .collect();
    (events, placed)
}

proptest! {
    #[test]
    fn placements_never_overlap(user in arb_user()) {
        let mut user = user;
        redistribute_all(&mut user, &HabitDistributor::new()).unwrap();

        for day in WEEK {
            let (events, placed) = busy_on(&user, day);
            for (i, a) in placed.iter().enumerate() {
                for event in &events {
                    prop_assert!(!a.overlaps(event), "{a} overlaps event {event} on {day}");
                }
                for b in &placed[i + 1..] {
                    prop_assert!(!a.overlaps(b), "{a} overlaps {b} on {day}");
                }
            }
        }
    }

    #[test]
    fn placed_count_is_bounded(user in arb_user()) {
        let mut user = user;
        let report = redistribute_all(&mut user, &HabitDistributor::new()).unwrap();

        for habit in &user.habits {
            prop_assert!(habit.placed() <= habit.times_per_week);
            prop_assert_eq!(habit.unplaced(), habit.times_per_week - habit.placed());
            prop_assert_eq!(report.get(&habit.name).unwrap_or(0), habit.unplaced());
            for occurrence in &habit.occurrences {
                prop_assert_eq!(occurrence.interval.duration_minutes(), habit.minutes);
            }
            if habit.times_per_week <= 7 {
                for day in WEEK {
                    prop_assert!(habit.occurrences_on(day) <= 1);
                }
            }
        }
    }

    #[test]
    fn fixed_habits_stay_inside_windows(user in arb_user()) {
        let mut user = user;
        redistribute_all(&mut user, &HabitDistributor::new()).unwrap();

        for habit in &user.habits {
            if let Placement::Fixed(windows) = &habit.placement {
                for occurrence in &habit.occurrences {
                    prop_assert!(windows.iter().any(|w| w.contains(&occurrence.interval)));
                }
            }
        }
    }

    #[test]
    fn redistribution_is_deterministic(user in arb_user()) {
        let distributor = HabitDistributor::new();
        let mut first = user.clone();
        let mut second = user;
        let first_report = redistribute_all(&mut first, &distributor).unwrap();
        let second_report = redistribute_all(&mut second, &distributor).unwrap();
        prop_assert_eq!(&first.habits, &second.habits);
        prop_assert_eq!(&first_report, &second_report);

        // Running again on the result changes nothing.
        let again = redistribute_all(&mut first, &distributor).unwrap();
        prop_assert_eq!(&first.habits, &second.habits);
        prop_assert_eq!(&again, &second_report);
    }
}
