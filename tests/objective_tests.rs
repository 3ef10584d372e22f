//! 目标实体状态测试
mod common;

use chrono::{DateTime, TimeDelta, Utc};
use common::{entity, ts, ManualClock, GUILD};
use mistwar::domain::model::{ObjectiveType, WvwOwner};
use mistwar::domain::objective::{ObjectiveTier, BUFF_DURATION};
use uuid::Uuid;

#[test]
fn test_new_entity_defaults() {
    let clock = ManualClock::new(ts(12, 0, 0));
    let keep = entity("38-6", ObjectiveType::Keep, clock);

    assert_eq!(keep.owner(), WvwOwner::Neutral);
    assert_eq!(keep.claimed_by(), None);
    assert_eq!(keep.yaks_delivered(), 0);
    assert_eq!(keep.last_flipped(), DateTime::<Utc>::UNIX_EPOCH);
    assert_eq!(keep.last_modified(), DateTime::<Utc>::UNIX_EPOCH);
    assert_eq!(keep.buff_duration(), TimeDelta::minutes(5));
    assert!(!keep.is_owned());
}

#[test]
fn test_setting_same_value_keeps_last_modified() {
    let clock = ManualClock::new(ts(12, 0, 0));
    let keep = entity("38-6", ObjectiveType::Keep, clock.clone());

    assert!(keep.set_owner(WvwOwner::Red));
    assert_eq!(keep.last_modified(), ts(12, 0, 0));

    clock.advance(TimeDelta::seconds(30));
    assert!(!keep.set_owner(WvwOwner::Red));
    assert!(!keep.set_claimed_by(None));
    assert!(!keep.set_yaks_delivered(0));
    assert!(!keep.set_guild_upgrades([]));
    assert_eq!(keep.last_modified(), ts(12, 0, 0));

    assert!(keep.set_yaks_delivered(12));
    assert_eq!(keep.last_modified(), ts(12, 0, 30));
}

#[test]
fn test_last_flip_is_not_a_modification() {
    let clock = ManualClock::new(ts(12, 0, 0));
    let camp = entity("38-15", ObjectiveType::Camp, clock);

    assert!(camp.set_last_flipped(ts(11, 58, 0)));
    assert!(!camp.set_last_flipped(ts(11, 58, 0)));
    assert_eq!(camp.last_modified(), DateTime::<Utc>::UNIX_EPOCH);
}

#[test]
fn test_last_modified_never_moves_back() {
    let clock = ManualClock::new(ts(12, 0, 0));
    let tower = entity("38-3", ObjectiveType::Tower, clock.clone());

    tower.set_owner(WvwOwner::Blue);
    clock.set(ts(11, 0, 0));
    assert!(tower.set_owner(WvwOwner::Green));
    assert_eq!(tower.last_modified(), ts(12, 0, 0));
}

#[test]
fn test_upgrade_order_is_irrelevant() {
    let clock = ManualClock::new(ts(12, 0, 0));
    let keep = entity("38-6", ObjectiveType::Keep, clock.clone());

    assert!(keep.set_guild_upgrades([583, 178]));
    clock.advance(TimeDelta::seconds(5));
    assert!(!keep.set_guild_upgrades([178, 583, 178]));
    assert_eq!(keep.guild_upgrades(), vec![178, 583]);
    assert_eq!(keep.last_modified(), ts(12, 0, 0));
}

#[test]
fn test_nil_guild_means_unclaimed() {
    let clock = ManualClock::new(ts(12, 0, 0));
    let camp = entity("38-15", ObjectiveType::Camp, clock);

    assert!(!camp.set_claimed_by(Some(Uuid::nil())));
    assert!(!camp.is_claimed());

    assert!(camp.set_claimed_by(Some(GUILD)));
    assert!(camp.is_claimed());
    assert!(camp.is_claimed_by(GUILD));
    assert!(!camp.is_claimed_by(Uuid::nil()));
}

#[test]
fn test_buff_window() {
    let clock = ManualClock::new(ts(12, 0, 0));
    let tower = entity("38-3", ObjectiveType::Tower, clock.clone());
    assert!(!tower.has_buff());

    tower.set_last_flipped(ts(12, 0, 0));
    assert!(tower.has_buff());
    assert_eq!(tower.buff_remaining(), Some(BUFF_DURATION));

    clock.advance(TimeDelta::minutes(4) + TimeDelta::seconds(59));
    let remaining = tower.buff_remaining().unwrap();
    assert!(remaining > TimeDelta::zero());
    assert_eq!(remaining, TimeDelta::seconds(1));

    clock.advance(TimeDelta::seconds(1));
    assert!(!tower.has_buff());
    assert_eq!(tower.buff_remaining(), None);
}

#[test]
fn test_tiers_follow_supply() {
    let clock = ManualClock::new(ts(12, 0, 0));
    let keep = entity("38-6", ObjectiveType::Keep, clock);

    for (yaks, tier) in [
        (0, ObjectiveTier::Supported),
        (19, ObjectiveTier::Supported),
        (20, ObjectiveTier::Secured),
        (59, ObjectiveTier::Secured),
        (60, ObjectiveTier::Reinforced),
        (139, ObjectiveTier::Reinforced),
        (140, ObjectiveTier::Fortified),
        (999, ObjectiveTier::Fortified),
    ] {
        keep.set_yaks_delivered(yaks);
        assert_eq!(keep.tier(), tier, "yaks = {}", yaks);
    }
    assert!(keep.has_upgraded());
}

#[test]
fn test_waypoint_rules() {
    let clock = ManualClock::new(ts(12, 0, 0));

    let spawn = entity("38-1", ObjectiveType::Spawn, clock.clone());
    assert!(spawn.has_regular_waypoint());

    let keep = entity("38-6", ObjectiveType::Keep, clock.clone());
    keep.set_yaks_delivered(139);
    assert!(!keep.has_regular_waypoint());
    keep.set_yaks_delivered(140);
    assert!(keep.has_regular_waypoint());

    let castle = entity("38-9", ObjectiveType::Castle, clock.clone());
    castle.set_yaks_delivered(200);
    assert!(castle.has_regular_waypoint());

    let camp = entity("38-15", ObjectiveType::Camp, clock);
    camp.set_yaks_delivered(200);
    assert!(!camp.has_regular_waypoint());
    assert!(!camp.has_emergency_waypoint());
    camp.set_guild_upgrades([178]);
    assert!(camp.has_emergency_waypoint());
    assert!(camp.has_guild_upgrades());
}

#[test]
fn test_any_team_color_counts_as_owned() {
    let clock = ManualClock::new(ts(12, 0, 0));
    let tower = entity("38-3", ObjectiveType::Tower, clock);

    for owner in [WvwOwner::Red, WvwOwner::Green, WvwOwner::Blue] {
        tower.set_owner(owner);
        assert!(tower.is_owned(), "{:?}", owner);
    }
    tower.set_owner(WvwOwner::Unknown);
    assert!(!tower.is_owned());
}
