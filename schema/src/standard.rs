//! Field tables for the stock game protocol.
//!
//! The entity table is ordered by how often each field changes, so typical
//! deltas only need a short change mask.

use crate::{FieldCodec, NetFields, NetFieldsBuilder};

/// Bits needed to name any entity.
const GENTITYNUM_BITS: u8 = 10;

/// Name of the player-state field holding the last executed command time.
pub const COMMAND_TIME_FIELD: &str = "commandTime";

/// Returns the stock entity-state field table.
#[must_use]
pub fn entity_fields() -> NetFields {
    let b = NetFields::builder()
        .field("pos.trTime", FieldCodec::sint(32))
        .field("pos.trBase[0]", FieldCodec::float())
        .field("pos.trBase[1]", FieldCodec::float())
        .field("pos.trDelta[0]", FieldCodec::float())
        .field("pos.trDelta[1]", FieldCodec::float())
        .field("pos.trBase[2]", FieldCodec::float())
        .field("apos.trBase[1]", FieldCodec::float())
        .field("pos.trDelta[2]", FieldCodec::float())
        .field("apos.trBase[0]", FieldCodec::float())
        .field("event", FieldCodec::uint(10))
        .field("angles2[1]", FieldCodec::float())
        .field("eType", FieldCodec::uint(8))
        .field("torsoAnim", FieldCodec::uint(8))
        .field("eventParm", FieldCodec::uint(8))
        .field("legsAnim", FieldCodec::uint(8))
        .field("groundEntityNum", FieldCodec::uint(GENTITYNUM_BITS))
        .field("pos.trType", FieldCodec::uint(8))
        .field("eFlags", FieldCodec::uint(19))
        .field("otherEntityNum", FieldCodec::uint(GENTITYNUM_BITS))
        .field("weapon", FieldCodec::uint(8))
        .field("clientNum", FieldCodec::uint(8))
        .field("angles[1]", FieldCodec::float())
        .field("pos.trDuration", FieldCodec::sint(32))
        .field("apos.trType", FieldCodec::uint(8))
        .field("origin[0]", FieldCodec::float())
        .field("origin[1]", FieldCodec::float())
        .field("origin[2]", FieldCodec::float())
        .field("solid", FieldCodec::uint(24))
        .field("powerups", FieldCodec::uint(16))
        .field("modelindex", FieldCodec::uint(8))
        .field("otherEntityNum2", FieldCodec::uint(GENTITYNUM_BITS))
        .field("loopSound", FieldCodec::uint(8))
        .field("generic1", FieldCodec::uint(8))
        .field("origin2[2]", FieldCodec::float())
        .field("origin2[0]", FieldCodec::float())
        .field("origin2[1]", FieldCodec::float())
        .field("modelindex2", FieldCodec::uint(8))
        .field("angles[0]", FieldCodec::float())
        .field("time", FieldCodec::sint(32))
        .field("apos.trTime", FieldCodec::sint(32))
        .field("apos.trDuration", FieldCodec::sint(32))
        .field("apos.trBase[2]", FieldCodec::float())
        .field("apos.trDelta[0]", FieldCodec::float())
        .field("apos.trDelta[1]", FieldCodec::float())
        .field("apos.trDelta[2]", FieldCodec::float())
        .field("time2", FieldCodec::sint(32))
        .field("angles[2]", FieldCodec::float())
        .field("angles2[0]", FieldCodec::float())
        .field("angles2[2]", FieldCodec::float())
        .field("constantLight", FieldCodec::uint(32))
        .field("frame", FieldCodec::uint(16));
    build_stock(b)
}

/// Returns the stock player-state field table.
///
/// `commandTime` comes first; the client reads it back to estimate ping.
#[must_use]
pub fn player_fields() -> NetFields {
    let b = NetFields::builder()
        .field(COMMAND_TIME_FIELD, FieldCodec::sint(32))
        .field("origin[0]", FieldCodec::float())
        .field("origin[1]", FieldCodec::float())
        .field("bobCycle", FieldCodec::uint(8))
        .field("velocity[0]", FieldCodec::float())
        .field("velocity[1]", FieldCodec::float())
        .field("viewangles[1]", FieldCodec::angle(16))
        .field("viewangles[0]", FieldCodec::angle(16))
        .field("weaponTime", FieldCodec::sint(16))
        .field("origin[2]", FieldCodec::float())
        .field("velocity[2]", FieldCodec::float())
        .field("legsTimer", FieldCodec::uint(8))
        .field("pm_time", FieldCodec::sint(16))
        .field("eventSequence", FieldCodec::uint(16))
        .field("torsoAnim", FieldCodec::uint(8))
        .field("movementDir", FieldCodec::uint(4))
        .field("events[0]", FieldCodec::uint(8))
        .field("legsAnim", FieldCodec::uint(8))
        .field("events[1]", FieldCodec::uint(8))
        .field("pm_flags", FieldCodec::uint(16))
        .field("groundEntityNum", FieldCodec::uint(GENTITYNUM_BITS))
        .field("weaponstate", FieldCodec::uint(4))
        .field("eFlags", FieldCodec::uint(16))
        .field("externalEvent", FieldCodec::uint(10))
        .field("gravity", FieldCodec::sint(16))
        .field("speed", FieldCodec::sint(16))
        .field("delta_angles[1]", FieldCodec::sint(16))
        .field("externalEventParm", FieldCodec::uint(8))
        .field("viewheight", FieldCodec::sint(8))
        .field("damageEvent", FieldCodec::uint(8))
        .field("damageYaw", FieldCodec::uint(8))
        .field("damagePitch", FieldCodec::uint(8))
        .field("damageCount", FieldCodec::uint(8))
        .field("generic1", FieldCodec::uint(8))
        .field("pm_type", FieldCodec::uint(8))
        .field("delta_angles[0]", FieldCodec::sint(16))
        .field("delta_angles[2]", FieldCodec::sint(16))
        .field("torsoTimer", FieldCodec::uint(12))
        .field("eventParms[0]", FieldCodec::uint(8))
        .field("eventParms[1]", FieldCodec::uint(8))
        .field("clientNum", FieldCodec::uint(8))
        .field("weapon", FieldCodec::uint(5))
        .field("viewangles[2]", FieldCodec::angle(16))
        .field("grapplePoint[0]", FieldCodec::float())
        .field("grapplePoint[1]", FieldCodec::float())
        .field("grapplePoint[2]", FieldCodec::float())
        .field("jumppad_ent", FieldCodec::uint(GENTITYNUM_BITS))
        .field("loopSound", FieldCodec::uint(16));
    build_stock(b)
}

fn build_stock(builder: NetFieldsBuilder) -> NetFields {
    match builder.build() {
        Ok(table) => table,
        // The stock tables are constant and covered by tests.
        Err(err) => unreachable!("stock field table is invalid: {err}"),
    }
}
