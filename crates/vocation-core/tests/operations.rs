//! Integration tests for the job operations API and the level-up sequence.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;

use common::{Delivered, Harness, actor, config, job_id};
use rust_decimal_macros::dec;
use vocation_core::{ActorProgression, JobsError};
use vocation_types::ProgressionRecord;

fn connected(h: &Harness, name: &str) -> Arc<ActorProgression> {
    h.registry.connect(&actor(name)).unwrap()
}

fn connected_at(h: &Harness, name: &str, job: &str, level: u32) -> Arc<ActorProgression> {
    h.gateway.inner.seed(
        &actor(name),
        [ProgressionRecord {
            job: job_id(job),
            level,
            experience: dec!(0),
        }],
    );
    connected(h, name)
}

fn level_up_lines(lines: &[Delivered]) -> usize {
    lines
        .iter()
        .filter(|line| match line {
            Delivered::Broadcast(text) | Delivered::Private(_, text) => {
                text.contains("is now a level") || text.contains("You are now a level")
            }
        })
        .count()
}

#[test]
fn join_is_idempotent() {
    let h = Harness::new(config(false));
    let alice = connected(&h, "Alice");
    let miner = h.job("Miner");

    assert!(h.ops.join_job(&alice, &miner).unwrap());
    assert!(alice.is_in_job(&miner.id));
    assert!(!h.ops.join_job(&alice, &miner).unwrap());

    assert_eq!(alice.job_count(), 1);
    assert_eq!(h.slots.takes.load(Ordering::SeqCst), 1);
    assert_eq!(h.gateway.joins.load(Ordering::SeqCst), 1);
    assert_eq!(h.slots.inner.used(&miner.id), 1);
}

#[test]
fn join_resolves_starting_title() {
    let h = Harness::new(config(false));
    let alice = connected(&h, "Alice");
    h.ops.join_job(&alice, &h.job("Miner")).unwrap();

    assert_eq!(
        alice.title(&job_id("Miner")).map(|t| t.name),
        Some(String::from("Novice"))
    );
    assert!(alice.display_name().ends_with("Miner\u{a7}f Alice"));
}

#[test]
fn leave_releases_slot_once() {
    let h = Harness::new(config(false));
    let alice = connected(&h, "Alice");
    let miner = h.job("Miner");
    h.ops.join_job(&alice, &miner).unwrap();

    assert!(h.ops.leave_job(&alice, &miner.id).unwrap());
    assert!(!h.ops.leave_job(&alice, &miner.id).unwrap());

    assert!(!alice.is_in_job(&miner.id));
    assert_eq!(h.slots.releases.load(Ordering::SeqCst), 1);
    assert_eq!(h.gateway.quits.load(Ordering::SeqCst), 1);
    assert_eq!(h.slots.inner.used(&miner.id), 0);
}

#[test]
fn leave_all_releases_every_held_job() {
    let h = Harness::new(config(false));
    let alice = connected(&h, "Alice");
    h.ops.join_job(&alice, &h.job("Miner")).unwrap();
    h.ops.join_job(&alice, &h.job("Farmer")).unwrap();

    assert_eq!(h.ops.leave_all_jobs(&alice).unwrap(), 2);

    assert_eq!(alice.job_count(), 0);
    assert_eq!(h.slots.releases.load(Ordering::SeqCst), 2);
    assert_eq!(h.gateway.quits.load(Ordering::SeqCst), 2);
    assert!(h.gateway.inner.stored(&actor("Alice")).is_empty());
    assert_eq!(alice.display_name(), "Alice");

    assert_eq!(h.ops.leave_all_jobs(&alice).unwrap(), 0);
    assert_eq!(h.slots.releases.load(Ordering::SeqCst), 2);
}

#[test]
fn transfer_from_unheld_job_is_noop() {
    let h = Harness::new(config(false));
    let alice = connected(&h, "Alice");
    let before = h.gateway.calls();

    assert!(!h.ops.transfer_job(&alice, &job_id("Miner"), &h.job("Farmer")).unwrap());

    assert_eq!(h.gateway.calls(), before);
    assert_eq!(alice.job_count(), 0);
    assert!(alice.is_saved());
}

#[test]
fn transfer_into_held_job_is_noop() {
    let h = Harness::new(config(false));
    let alice = connected(&h, "Alice");
    h.ops.join_job(&alice, &h.job("Miner")).unwrap();
    h.ops.join_job(&alice, &h.job("Farmer")).unwrap();
    let before = h.gateway.calls();

    assert!(!h.ops.transfer_job(&alice, &job_id("Miner"), &h.job("Farmer")).unwrap());
    assert_eq!(h.gateway.calls(), before);
    assert_eq!(alice.job_count(), 2);
}

#[test]
fn transfer_moves_progression_and_saves() {
    let h = Harness::new(config(false));
    let alice = connected_at(&h, "Alice", "Miner", 12);

    assert!(h.ops.transfer_job(&alice, &job_id("Miner"), &h.job("Farmer")).unwrap());

    assert!(!alice.is_in_job(&job_id("Miner")));
    // Farmer caps at 10.
    assert_eq!(alice.level(&job_id("Farmer")), Some(10));
    assert_eq!(alice.title(&job_id("Farmer")), None);
    assert!(alice.is_saved());
    assert_eq!(h.gateway.quits.load(Ordering::SeqCst), 1);
    assert_eq!(h.gateway.joins.load(Ordering::SeqCst), 1);
    assert_eq!(h.gateway.full_saves.load(Ordering::SeqCst), 1);
    assert_eq!(h.slots.takes.load(Ordering::SeqCst), 0);
    assert_eq!(
        h.gateway.inner.stored(&actor("Alice")),
        vec![ProgressionRecord {
            job: job_id("Farmer"),
            level: 10,
            experience: dec!(0),
        }]
    );
}

#[test]
fn multi_level_gain_announces_once() {
    let h = Harness::new(config(false));
    let alice = connected_at(&h, "Alice", "Miner", 4);
    assert_eq!(
        alice.title(&job_id("Miner")).map(|t| t.name),
        Some(String::from("Novice"))
    );

    // 400 reaches level 5, 500 more reaches 6, 50 left over.
    assert!(h.ops.add_experience(&alice, &job_id("Miner"), dec!(950)).unwrap());

    assert_eq!(alice.level(&job_id("Miner")), Some(6));
    assert_eq!(alice.experience(&job_id("Miner")), Some(dec!(50)));

    let lines = h.delivery.taken();
    assert_eq!(lines.len(), 2);
    match (&lines[0], &lines[1]) {
        (Delivered::Broadcast(level_up), Delivered::Broadcast(skill_up)) => {
            assert!(level_up.contains("is now a level 6"));
            assert!(level_up.contains("Novice"));
            assert!(
                skill_up.contains("promoted to a \u{a7}6Apprentice\u{a7}f \u{a7}7Miner\u{a7}f")
            );
        }
        other => panic!("unexpected delivery: {other:?}"),
    }

    assert_eq!(
        alice.title(&job_id("Miner")).map(|t| t.name),
        Some(String::from("Apprentice"))
    );
    assert!(alice.display_name().starts_with("\u{a7}6Apprentice"));
    // One on connect, one on level-up.
    assert_eq!(h.permissions.recomputes.load(Ordering::SeqCst), 2);
    assert_eq!(h.gateway.full_saves.load(Ordering::SeqCst), 1);
    assert!(alice.is_saved());
}

#[test]
fn level_up_without_title_change_sends_no_skill_up() {
    let h = Harness::new(config(false));
    let alice = connected(&h, "Alice");
    h.ops.join_job(&alice, &h.job("Miner")).unwrap();

    assert!(h.ops.add_experience(&alice, &job_id("Miner"), dec!(100)).unwrap());

    let lines = h.delivery.taken();
    assert_eq!(lines.len(), 1);
    assert_eq!(level_up_lines(&lines), 1);
}

#[test]
fn gain_below_threshold_saves_without_announcing() {
    let h = Harness::new(config(false));
    let alice = connected(&h, "Alice");
    h.ops.join_job(&alice, &h.job("Miner")).unwrap();

    assert!(!h.ops.add_experience(&alice, &job_id("Miner"), dec!(40)).unwrap());

    assert!(h.delivery.taken().is_empty());
    assert_eq!(h.gateway.full_saves.load(Ordering::SeqCst), 1);
    assert_eq!(
        h.gateway.inner.stored(&actor("Alice"))[0].experience,
        dec!(40)
    );
}

#[test]
fn experience_on_unheld_job_is_noop() {
    let h = Harness::new(config(false));
    let alice = connected(&h, "Alice");

    assert!(!h.ops.add_experience(&alice, &job_id("Miner"), dec!(500)).unwrap());
    assert!(!h.ops.remove_experience(&alice, &job_id("Miner"), dec!(5)).unwrap());

    assert_eq!(h.gateway.full_saves.load(Ordering::SeqCst), 0);
    assert!(h.delivery.taken().is_empty());
}

#[test]
fn private_announcements_reach_only_online_actor() {
    let mut cfg = config(false);
    cfg.broadcast.on_levelup = false;
    cfg.broadcast.on_skillup = false;
    let h = Harness::new(cfg);
    let alice = connected_at(&h, "Alice", "Miner", 4);

    h.ops.add_experience(&alice, &job_id("Miner"), dec!(400)).unwrap();

    let lines = h.delivery.taken();
    assert_eq!(lines.len(), 2);
    assert!(
        lines
            .iter()
            .all(|line| matches!(line, Delivered::Private(who, _) if who == &actor("Alice")))
    );
    match &lines[0] {
        Delivered::Private(_, text) => assert!(text.starts_with("You are now a level 5")),
        Delivered::Broadcast(_) => panic!("level-up should be private"),
    }
}

#[test]
fn private_announcements_dropped_for_offline_actor() {
    let mut cfg = config(false);
    cfg.broadcast.on_levelup = false;
    cfg.broadcast.on_skillup = false;
    let h = Harness::new(cfg);
    h.gateway.inner.seed(
        &actor("Carol"),
        [ProgressionRecord {
            job: job_id("Miner"),
            level: 4,
            experience: dec!(0),
        }],
    );
    let carol = h.registry.lookup(&actor("Carol")).unwrap();

    assert!(h.ops.add_experience(&carol, &job_id("Miner"), dec!(400)).unwrap());

    assert!(h.delivery.taken().is_empty());
    assert_eq!(carol.level(&job_id("Miner")), Some(5));
    assert_eq!(h.gateway.inner.stored(&actor("Carol"))[0].level, 5);
}

#[test]
fn skill_up_follows_its_own_broadcast_flag() {
    let mut cfg = config(false);
    cfg.broadcast.on_levelup = false;
    cfg.broadcast.on_skillup = true;
    let h = Harness::new(cfg);
    let alice = connected_at(&h, "Alice", "Miner", 4);

    h.ops.add_experience(&alice, &job_id("Miner"), dec!(400)).unwrap();

    let lines = h.delivery.taken();
    assert_eq!(lines.len(), 2);
    assert!(matches!(lines[0], Delivered::Private(..)));
    assert!(matches!(lines[1], Delivered::Broadcast(_)));
}

#[test]
fn multi_line_templates_deliver_each_line() {
    let mut cfg = config(false);
    cfg.messages.insert(
        String::from("message.levelup.broadcast"),
        String::from("Ding!\n%playername% reached %joblevel%"),
    );
    let h = Harness::new(cfg);
    let alice = connected(&h, "Alice");
    h.ops.join_job(&alice, &h.job("Farmer")).unwrap();

    h.ops.add_experience(&alice, &job_id("Farmer"), dec!(100)).unwrap();

    let lines = h.delivery.taken();
    assert_eq!(
        lines,
        vec![
            Delivered::Broadcast(String::from("Ding!")),
            Delivered::Broadcast(format!("{} reached 2", alice_display_before_level_up())),
        ]
    );
}

/// Farmer shows no title, so Alice's honorific is just the colored job.
fn alice_display_before_level_up() -> String {
    String::from("\u{a7}2Farmer\u{a7}f Alice")
}

#[test]
fn levels_never_decrease_and_announce_at_most_once_per_gain() {
    let h = Harness::new(config(false));
    let alice = connected(&h, "Alice");
    h.ops.join_job(&alice, &h.job("Miner")).unwrap();

    let gains = [dec!(50), dec!(60), dec!(0), dec!(900), dec!(1), dec!(5000), dec!(250)];
    let mut last = 1;
    for gain in gains {
        let leveled = h.ops.add_experience(&alice, &job_id("Miner"), gain).unwrap();
        let level = alice.level(&job_id("Miner")).unwrap();
        assert!(level >= last);
        assert_eq!(leveled, level > last);

        let announced = level_up_lines(&h.delivery.taken());
        assert_eq!(announced, usize::from(leveled));
        last = level;
    }
}

#[test]
fn remove_experience_floors_at_zero_without_delevel() {
    let h = Harness::new(config(false));
    let alice = connected_at(&h, "Alice", "Miner", 3);
    h.ops.add_experience(&alice, &job_id("Miner"), dec!(120)).unwrap();

    assert!(h.ops.remove_experience(&alice, &job_id("Miner"), dec!(20)).unwrap());
    assert_eq!(alice.experience(&job_id("Miner")), Some(dec!(100)));

    assert!(h.ops.remove_experience(&alice, &job_id("Miner"), dec!(1000)).unwrap());
    assert_eq!(alice.experience(&job_id("Miner")), Some(dec!(0)));
    assert_eq!(alice.level(&job_id("Miner")), Some(3));
    assert_eq!(h.gateway.inner.stored(&actor("Alice"))[0].experience, dec!(0));
}

#[test]
fn promote_and_demote_resolve_titles_silently() {
    let h = Harness::new(config(false));
    let alice = connected(&h, "Alice");
    h.ops.join_job(&alice, &h.job("Miner")).unwrap();

    assert!(h.ops.promote_job(&alice, &job_id("Miner"), 4).unwrap());
    assert_eq!(alice.level(&job_id("Miner")), Some(5));
    assert_eq!(
        alice.title(&job_id("Miner")).map(|t| t.name),
        Some(String::from("Apprentice"))
    );

    assert!(h.ops.demote_job(&alice, &job_id("Miner"), 10).unwrap());
    assert_eq!(alice.level(&job_id("Miner")), Some(1));
    assert_eq!(
        alice.title(&job_id("Miner")).map(|t| t.name),
        Some(String::from("Novice"))
    );

    assert!(h.delivery.taken().is_empty());
    assert_eq!(h.gateway.full_saves.load(Ordering::SeqCst), 2);
    assert_eq!(h.gateway.inner.stored(&actor("Alice"))[0].level, 1);
}

#[test]
fn promote_caps_at_max_level() {
    let h = Harness::new(config(false));
    let alice = connected(&h, "Alice");
    h.ops.join_job(&alice, &h.job("Farmer")).unwrap();

    assert!(h.ops.promote_job(&alice, &job_id("Farmer"), 100).unwrap());
    assert_eq!(alice.level(&job_id("Farmer")), Some(10));
    assert!(!h.ops.promote_job(&alice, &job_id("Farmer"), 1).unwrap());

    // Experience at the cap is discarded.
    assert!(!h.ops.add_experience(&alice, &job_id("Farmer"), dec!(5000)).unwrap());
    assert_eq!(alice.experience(&job_id("Farmer")), Some(dec!(0)));
}

#[test]
fn promote_on_unheld_job_writes_nothing() {
    let h = Harness::new(config(false));
    let alice = connected(&h, "Alice");

    assert!(!h.ops.promote_job(&alice, &job_id("Miner"), 2).unwrap());
    assert!(!h.ops.demote_job(&alice, &job_id("Miner"), 2).unwrap());
    assert_eq!(h.gateway.full_saves.load(Ordering::SeqCst), 0);
}

#[test]
fn permission_failure_propagates_but_keeps_level() {
    let h = Harness::new(config(false));
    let alice = connected(&h, "Alice");
    h.ops.join_job(&alice, &h.job("Miner")).unwrap();
    h.permissions.failing.store(true, Ordering::SeqCst);

    let result = h.ops.add_experience(&alice, &job_id("Miner"), dec!(100));

    assert!(matches!(result, Err(JobsError::Permissions { .. })));
    assert_eq!(alice.level(&job_id("Miner")), Some(2));
    assert!(!alice.is_saved());
}

#[test]
fn save_failure_propagates_and_leaves_state_dirty() {
    let h = Harness::new(config(false));
    let alice = connected(&h, "Alice");
    h.ops.join_job(&alice, &h.job("Miner")).unwrap();
    h.gateway.set_failing(true);

    let result = h.ops.promote_job(&alice, &job_id("Miner"), 1);

    assert!(matches!(result, Err(JobsError::Persistence { .. })));
    assert_eq!(alice.level(&job_id("Miner")), Some(2));
    assert!(!alice.is_saved());
}

#[test]
fn concurrent_gains_on_one_actor_serialize() {
    let h = Arc::new(Harness::new(config(false)));
    let alice = connected(&h, "Alice");
    h.ops.join_job(&alice, &h.job("Miner")).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let h = Arc::clone(&h);
            let alice = Arc::clone(&alice);
            thread::spawn(move || {
                for _ in 0..100 {
                    h.ops.add_experience(&alice, &job_id("Miner"), dec!(1)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // 800 total: 100 to level 2, 200 to level 3, 300 to level 4, 200 left.
    assert_eq!(alice.level(&job_id("Miner")), Some(4));
    assert_eq!(alice.experience(&job_id("Miner")), Some(dec!(200)));
    assert_eq!(level_up_lines(&h.delivery.taken()), 3);
}

#[test]
fn concurrent_joins_across_actors_count_every_slot() {
    let h = Arc::new(Harness::new(config(false)));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let h = Arc::clone(&h);
            thread::spawn(move || {
                let entry = h.registry.connect(&actor(&format!("Actor{i}"))).unwrap();
                h.ops.join_job(&entry, &h.job("Miner")).unwrap();
                h.ops.join_job(&entry, &h.job("Miner")).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(h.slots.inner.used(&job_id("Miner")), 16);
    assert_eq!(h.slots.takes.load(Ordering::SeqCst), 16);
}
