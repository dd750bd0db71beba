//! Avatar hold constraint
//!
//! Pins a held object to an avatar palm. Each tick the constraint reads
//! the holder's palm pose, composes the configured relative offset and
//! forwards the resulting world-space target to an underlying spring
//! constraint. All per-tick lock acquisitions are non-blocking: a missed
//! tick is acceptable and self-corrects on the next one, since the target
//! is recomputed from scratch every time.

use std::sync::{Mutex, RwLock};

use log::{debug, error, warn};
use thiserror::Error;

use crate::avatar::arguments::{
    extract_float, extract_quat, extract_str, extract_vec3, ArgValue, ArgumentMap,
};
use crate::avatar::{AvatarId, AvatarRoster, Hand, INVALID_AVATAR_ID};
use crate::foundation::math::{Quat, Vec3};

/// Persisted record type tag for hold constraints
pub const HOLD_ACTION_TYPE: u16 = 3;

/// Version tag of the persisted hold record
pub const HOLD_VERSION: u16 = 1;

/// Smallest accepted spring time scale
pub const MIN_TIMESCALE: f32 = 0.1;

/// Errors reading a persisted hold record
#[derive(Error, Debug)]
pub enum HoldError {
    /// Record ended before all fields were read
    #[error("hold record truncated")]
    UnexpectedEof,

    /// Record does not describe a hold constraint
    #[error("record type {0} is not a hold constraint")]
    TypeMismatch(u16),

    /// Record belongs to a different item
    #[error("record item {found} does not match constraint item {expected}")]
    IdMismatch {
        /// Item this constraint is bound to
        expected: u64,
        /// Item named by the record
        found: u64,
    },

    /// A string field held invalid UTF-8
    #[error("invalid UTF-8 in hold record string")]
    InvalidString,

    /// The persisted hand value is not `left` or `right`
    #[error("unknown hand {0:?} in hold record")]
    InvalidHand(String),
}

/// Target consumer of the hold constraint
///
/// The spring owns the actual physics coupling; the hold constraint only
/// feeds it a world-space target each successful tick.
pub trait SpringConstraint: Send {
    /// Replace the spring's target pose and stiffness time scales
    fn set_target(
        &mut self,
        position: Vec3,
        rotation: Quat,
        linear_time_scale: f32,
        angular_time_scale: f32,
    );

    /// Advance the spring by one tick
    fn update(&mut self, delta_time: f32);
}

struct HoldState {
    relative_position: Vec3,
    relative_rotation: Quat,
    linear_time_scale: f32,
    angular_time_scale: f32,
    hand: Hand,
    holder: AvatarId,
    expires: u64,
    tag: String,
    active: bool,
}

impl Default for HoldState {
    fn default() -> Self {
        Self {
            relative_position: Vec3::zeros(),
            relative_rotation: Quat::identity(),
            linear_time_scale: MIN_TIMESCALE,
            angular_time_scale: MIN_TIMESCALE,
            hand: Hand::Right,
            holder: INVALID_AVATAR_ID,
            expires: 0,
            tag: String::new(),
            active: false,
        }
    }
}

/// Constraint pinning an item to an avatar palm
pub struct HoldAction {
    item_id: u64,
    state: RwLock<HoldState>,
    spring: Mutex<Box<dyn SpringConstraint>>,
}

impl HoldAction {
    /// Create an inactive hold constraint for the given item
    pub fn new(item_id: u64, spring: Box<dyn SpringConstraint>) -> Self {
        Self {
            item_id,
            state: RwLock::new(HoldState::default()),
            spring: Mutex::new(spring),
        }
    }

    /// Item this constraint is bound to
    pub fn item_id(&self) -> u64 {
        self.item_id
    }

    /// Whether the constraint has been configured or restored
    pub fn is_active(&self) -> bool {
        self.state.read().unwrap().active
    }

    /// Expiry timestamp carried in the persisted record
    pub fn expiry(&self) -> u64 {
        self.state.read().unwrap().expires
    }

    /// Set the expiry timestamp
    pub fn set_expiry(&self, expires: u64) {
        self.state.write().unwrap().expires = expires;
    }

    /// Free-form tag carried in the persisted record
    pub fn tag(&self) -> String {
        self.state.read().unwrap().tag.clone()
    }

    /// Set the free-form tag
    pub fn set_tag(&self, tag: impl Into<String>) {
        self.state.write().unwrap().tag = tag.into();
    }

    /// Run one constraint tick
    ///
    /// Skips the tick entirely on read contention, an unknown holder, or
    /// write contention on the spring; the spring update only runs when
    /// both the read and the write succeeded.
    pub fn update_action(&self, roster: &dyn AvatarRoster, delta_time: f32) {
        let Ok(state) = self.state.try_read() else {
            return;
        };
        let Some((palm_position, palm_rotation)) = roster.palm_pose(state.holder, state.hand)
        else {
            return;
        };

        let rotation = palm_rotation * state.relative_rotation;
        let position = palm_position + rotation * state.relative_position;
        let linear = state.linear_time_scale;
        let angular = state.angular_time_scale;
        drop(state);

        let Ok(mut spring) = self.spring.try_lock() else {
            return;
        };
        spring.set_target(position, rotation, linear, angular);
        spring.update(delta_time);
    }

    /// Update configuration from a named-argument map
    ///
    /// Missing, mistyped or invalid entries keep their previous value;
    /// the holder identity always comes from the roster's local avatar,
    /// never from the map. Returns whether anything changed; changes are
    /// applied all-or-nothing.
    pub fn update_arguments(&self, args: &ArgumentMap, roster: &dyn AvatarRoster) -> bool {
        let (changed, relative_position, relative_rotation, time_scale, hand, holder) = {
            let state = self.state.read().unwrap();

            let relative_position =
                extract_vec3("hold", args, "relativePosition").unwrap_or(state.relative_position);
            let relative_rotation =
                extract_quat("hold", args, "relativeRotation").unwrap_or(state.relative_rotation);
            let time_scale = extract_float("hold", args, "timeScale")
                .unwrap_or(state.linear_time_scale)
                .max(MIN_TIMESCALE);
            let hand = match extract_str("hold", args, "hand") {
                Some(value) => Hand::from_arg(value).unwrap_or_else(|| {
                    warn!("hold: hand must be \"left\" or \"right\", got {value:?}");
                    state.hand
                }),
                None => state.hand,
            };
            let holder = roster.local_avatar();

            let changed = relative_position != state.relative_position
                || relative_rotation != state.relative_rotation
                || time_scale != state.linear_time_scale
                || hand != state.hand
                || holder != state.holder;
            (changed, relative_position, relative_rotation, time_scale, hand, holder)
        };

        if changed {
            let mut state = self.state.write().unwrap();
            state.relative_position = relative_position;
            state.relative_rotation = relative_rotation;
            state.linear_time_scale = time_scale;
            state.angular_time_scale = time_scale;
            state.hand = hand;
            state.holder = holder;
            state.active = true;
        }
        changed
    }

    /// Current configuration as a named-argument map
    pub fn arguments(&self) -> ArgumentMap {
        let state = self.state.read().unwrap();
        let mut args = ArgumentMap::new();
        args.insert("holderID".to_string(), ArgValue::Id(state.holder));
        args.insert(
            "relativePosition".to_string(),
            ArgValue::Vec3(state.relative_position),
        );
        args.insert(
            "relativeRotation".to_string(),
            ArgValue::Quat(state.relative_rotation),
        );
        args.insert("timeScale".to_string(), ArgValue::Float(state.linear_time_scale));
        args.insert("hand".to_string(), ArgValue::Str(state.hand.as_str().to_string()));
        args
    }

    /// Serialize the constraint into its versioned binary record
    pub fn serialize(&self) -> Vec<u8> {
        let state = self.state.read().unwrap();
        let mut out = Vec::new();

        out.extend_from_slice(&HOLD_ACTION_TYPE.to_le_bytes());
        out.extend_from_slice(&self.item_id.to_le_bytes());
        out.extend_from_slice(&HOLD_VERSION.to_le_bytes());

        out.extend_from_slice(&state.holder.to_le_bytes());
        for component in state.relative_position.iter() {
            out.extend_from_slice(&component.to_le_bytes());
        }
        let coords = state.relative_rotation.into_inner().coords;
        for component in coords.iter() {
            out.extend_from_slice(&component.to_le_bytes());
        }
        out.extend_from_slice(&state.linear_time_scale.to_le_bytes());
        put_str(&mut out, state.hand.as_str());
        out.extend_from_slice(&state.expires.to_le_bytes());
        put_str(&mut out, &state.tag);

        out
    }

    /// Restore the constraint from a persisted record
    ///
    /// A record with an unrecognized version is skipped silently, leaving
    /// the in-memory state untouched. Type or item mismatches are caller
    /// errors and rejected without mutating anything.
    pub fn deserialize(&self, data: &[u8]) -> Result<(), HoldError> {
        let mut reader = Reader::new(data);

        let record_type = reader.u16()?;
        if record_type != HOLD_ACTION_TYPE {
            error!("hold record type {record_type} does not match, rejecting");
            return Err(HoldError::TypeMismatch(record_type));
        }
        let item_id = reader.u64()?;
        if item_id != self.item_id {
            error!("hold record item {item_id} does not match {}, rejecting", self.item_id);
            return Err(HoldError::IdMismatch {
                expected: self.item_id,
                found: item_id,
            });
        }
        let version = reader.u16()?;
        if version != HOLD_VERSION {
            debug!("skipping hold record with unsupported version {version}");
            return Ok(());
        }

        let holder = reader.u64()?;
        let relative_position = Vec3::new(reader.f32()?, reader.f32()?, reader.f32()?);
        let (i, j, k, w) = (reader.f32()?, reader.f32()?, reader.f32()?, reader.f32()?);
        let relative_rotation = Quat::new_normalize(nalgebra::Quaternion::new(w, i, j, k));
        let linear_time_scale = reader.f32()?;
        let hand_value = reader.string()?;
        let hand = Hand::from_arg(&hand_value).ok_or(HoldError::InvalidHand(hand_value))?;
        let expires = reader.u64()?;
        let tag = reader.string()?;

        let mut state = self.state.write().unwrap();
        state.holder = holder;
        state.relative_position = relative_position;
        state.relative_rotation = relative_rotation;
        state.linear_time_scale = linear_time_scale;
        state.angular_time_scale = linear_time_scale;
        state.hand = hand;
        state.expires = expires;
        state.tag = tag;
        state.active = true;
        Ok(())
    }
}

fn put_str(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(&u32::try_from(value.len()).unwrap_or(u32::MAX).to_le_bytes());
    out.extend_from_slice(value.as_bytes());
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], HoldError> {
        let end = self.pos.checked_add(len).ok_or(HoldError::UnexpectedEof)?;
        let bytes = self.data.get(self.pos..end).ok_or(HoldError::UnexpectedEof)?;
        self.pos = end;
        Ok(bytes)
    }

    fn u16(&mut self) -> Result<u16, HoldError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32, HoldError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn u64(&mut self) -> Result<u64, HoldError> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    fn f32(&mut self) -> Result<f32, HoldError> {
        let bytes = self.take(4)?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn string(&mut self) -> Result<String, HoldError> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| HoldError::InvalidString)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedRoster {
        local: AvatarId,
        palm_position: Vec3,
        palm_rotation: Quat,
        known: bool,
    }

    impl FixedRoster {
        fn new(local: AvatarId) -> Self {
            Self {
                local,
                palm_position: Vec3::new(1.0, 2.0, 3.0),
                palm_rotation: Quat::identity(),
                known: true,
            }
        }
    }

    impl AvatarRoster for FixedRoster {
        fn palm_pose(&self, holder: AvatarId, _hand: Hand) -> Option<(Vec3, Quat)> {
            (self.known && holder == self.local).then_some((self.palm_position, self.palm_rotation))
        }

        fn local_avatar(&self) -> AvatarId {
            self.local
        }
    }

    #[derive(Default)]
    struct RecordingSpring {
        targets: Arc<Mutex<Vec<(Vec3, Quat, f32, f32)>>>,
        updates: Arc<AtomicUsize>,
    }

    impl SpringConstraint for RecordingSpring {
        fn set_target(
            &mut self,
            position: Vec3,
            rotation: Quat,
            linear_time_scale: f32,
            angular_time_scale: f32,
        ) {
            self.targets
                .lock()
                .unwrap()
                .push((position, rotation, linear_time_scale, angular_time_scale));
        }

        fn update(&mut self, _delta_time: f32) {
            self.updates.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn configured_action(roster: &FixedRoster) -> (HoldAction, Arc<Mutex<Vec<(Vec3, Quat, f32, f32)>>>, Arc<AtomicUsize>) {
        let spring = RecordingSpring::default();
        let targets = Arc::clone(&spring.targets);
        let updates = Arc::clone(&spring.updates);
        let action = HoldAction::new(42, Box::new(spring));

        let mut args = ArgumentMap::new();
        args.insert(
            "relativePosition".to_string(),
            ArgValue::Vec3(Vec3::new(0.0, 0.5, 0.0)),
        );
        args.insert("hand".to_string(), ArgValue::Str("left".to_string()));
        args.insert("timeScale".to_string(), ArgValue::Float(0.25));
        assert!(action.update_arguments(&args, roster));

        (action, targets, updates)
    }

    #[test]
    fn test_tick_forwards_composed_pose() {
        let roster = FixedRoster::new(7);
        let (action, targets, updates) = configured_action(&roster);

        action.update_action(&roster, 1.0 / 90.0);

        let recorded = targets.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        let (position, rotation, linear, angular) = recorded[0];
        // Identity palm rotation, so the target is palm + relative offset
        assert_relative_eq!(position.x, 1.0);
        assert_relative_eq!(position.y, 2.5);
        assert_relative_eq!(position.z, 3.0);
        assert_eq!(rotation, Quat::identity());
        assert_relative_eq!(linear, 0.25);
        assert_relative_eq!(angular, 0.25);
        assert_eq!(updates.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tick_skips_unknown_holder() {
        let mut roster = FixedRoster::new(7);
        let (action, _targets, updates) = configured_action(&roster);

        roster.known = false;
        action.update_action(&roster, 1.0 / 90.0);
        assert_eq!(updates.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_hand_keeps_previous_value() {
        let roster = FixedRoster::new(7);
        let (action, _targets, _updates) = configured_action(&roster);

        // Only the hand differs, and it is invalid, so nothing changed
        let mut args = ArgumentMap::new();
        args.insert("hand".to_string(), ArgValue::Str("up".to_string()));
        assert!(!action.update_arguments(&args, &roster));
        assert_eq!(action.arguments()["hand"], ArgValue::Str("left".to_string()));

        // An invalid hand plus a genuine change still reports changed
        args.insert("timeScale".to_string(), ArgValue::Float(0.5));
        assert!(action.update_arguments(&args, &roster));
        assert_eq!(action.arguments()["hand"], ArgValue::Str("left".to_string()));
        assert_eq!(action.arguments()["timeScale"], ArgValue::Float(0.5));
    }

    #[test]
    fn test_time_scale_floor() {
        let roster = FixedRoster::new(7);
        let (action, _targets, _updates) = configured_action(&roster);

        let mut args = ArgumentMap::new();
        args.insert("timeScale".to_string(), ArgValue::Float(0.01));
        assert!(action.update_arguments(&args, &roster));
        assert_eq!(action.arguments()["timeScale"], ArgValue::Float(MIN_TIMESCALE));

        // Another sub-floor value is floored to the same result: no change
        args.insert("timeScale".to_string(), ArgValue::Float(0.05));
        assert!(!action.update_arguments(&args, &roster));
    }

    #[test]
    fn test_record_round_trip() {
        let roster = FixedRoster::new(7);
        let (source, _targets, _updates) = configured_action(&roster);
        source.set_expiry(123_456);
        source.set_tag("grab");

        let restored = HoldAction::new(42, Box::new(RecordingSpring::default()));
        restored.deserialize(&source.serialize()).unwrap();

        assert_eq!(restored.arguments(), source.arguments());
        assert_eq!(restored.expiry(), 123_456);
        assert_eq!(restored.tag(), "grab");
        assert!(restored.is_active());
    }

    #[test]
    fn test_unknown_version_is_skipped() {
        let roster = FixedRoster::new(7);
        let (source, _targets, _updates) = configured_action(&roster);

        let mut record = source.serialize();
        // Version lives after the type tag and item id
        record[10..12].copy_from_slice(&99u16.to_le_bytes());

        let restored = HoldAction::new(42, Box::new(RecordingSpring::default()));
        restored.deserialize(&record).unwrap();
        assert!(!restored.is_active());
        assert_eq!(restored.arguments()["hand"], ArgValue::Str("right".to_string()));
    }

    #[test]
    fn test_mismatched_record_rejected() {
        let roster = FixedRoster::new(7);
        let (source, _targets, _updates) = configured_action(&roster);
        let record = source.serialize();

        let other_item = HoldAction::new(43, Box::new(RecordingSpring::default()));
        assert!(matches!(
            other_item.deserialize(&record),
            Err(HoldError::IdMismatch { expected: 43, found: 42 })
        ));
        assert!(!other_item.is_active());

        let mut wrong_type = record.clone();
        wrong_type[0..2].copy_from_slice(&1u16.to_le_bytes());
        let restored = HoldAction::new(42, Box::new(RecordingSpring::default()));
        assert!(matches!(
            restored.deserialize(&wrong_type),
            Err(HoldError::TypeMismatch(1))
        ));
    }

    #[test]
    fn test_truncated_record_errors() {
        let roster = FixedRoster::new(7);
        let (source, _targets, _updates) = configured_action(&roster);
        let record = source.serialize();

        let restored = HoldAction::new(42, Box::new(RecordingSpring::default()));
        assert!(matches!(
            restored.deserialize(&record[..record.len() - 4]),
            Err(HoldError::UnexpectedEof)
        ));
    }
}
