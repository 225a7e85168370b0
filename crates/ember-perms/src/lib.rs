//! Permission resolution: role bitmasks plus per-channel allow/deny overrides.
//!
//! Pure functions only — no I/O, no locking. Callable identically from the
//! HTTP contract layer and the WebSocket intent dispatch path.

use bitflags::bitflags;
use ember_ids::RoleId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    pub struct Permissions: u64 {
        const CREATE_INSTANT_INVITE = 1 << 0;
        const KICK_MEMBERS          = 1 << 1;
        const BAN_MEMBERS           = 1 << 2;
        const ADMINISTRATOR         = 1 << 3;
        const MANAGE_CHANNELS       = 1 << 4;
        const MANAGE_GUILD          = 1 << 5;
        const ADD_REACTIONS         = 1 << 6;
        const VIEW_AUDIT_LOG        = 1 << 7;
        const VIEW_CHANNEL          = 1 << 8;
        const SEND_MESSAGES         = 1 << 9;
        const MANAGE_MESSAGES       = 1 << 10;
        const ATTACH_FILES          = 1 << 11;
        const READ_MESSAGE_HISTORY  = 1 << 12;
        const MENTION_EVERYONE      = 1 << 13;
        const CONNECT               = 1 << 14;
        const SPEAK                 = 1 << 15;
        const STREAM                = 1 << 16;
        const MUTE_MEMBERS          = 1 << 17;
        const DEAFEN_MEMBERS        = 1 << 18;
        const MOVE_MEMBERS          = 1 << 19;
        const CHANGE_NICKNAME       = 1 << 20;
        const MANAGE_NICKNAMES      = 1 << 21;
        const MANAGE_ROLES          = 1 << 22;
        const MANAGE_EMOJIS         = 1 << 23;
    }
}

impl Serialize for Permissions {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.bits().to_string().serialize(s)
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        let bits: u64 = raw
            .parse()
            .map_err(|e| serde::de::Error::custom(format!("invalid permission bits: {e}")))?;
        Ok(Permissions::from_bits_truncate(bits))
    }
}

/// Stored as a `bigint` column; the sign bit is never set in practice since
/// only 24 of the 63 usable bits are assigned.
impl sqlx::Type<sqlx::Postgres> for Permissions {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i64 as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Permissions {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let bits = <i64 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Permissions::from_bits_truncate(bits as u64))
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for Permissions {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i64 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&(self.bits() as i64), buf)
    }
}

/// Everything the engine needs to know about one of the user's roles.
/// Deliberately decoupled from the full `Role` entity so this crate has no
/// dependency on the data model.
#[derive(Clone, Copy, Debug)]
pub struct RoleGrant {
    pub role_id: RoleId,
    pub position: i32,
    pub permissions: Permissions,
}

/// A `(channel, role)` allow/deny override.
#[derive(Clone, Copy, Debug)]
pub struct ChannelOverride {
    pub role_id: RoleId,
    pub allow: Permissions,
    pub deny: Permissions,
}

/// Union of every role the user holds in the server, including the default
/// role. `Administrator` short-circuits to every bit set.
///
/// Fails closed: an empty `roles` slice (not a member) yields empty
/// permissions, never `Administrator`.
pub fn effective_server(roles: &[RoleGrant]) -> Permissions {
    let mut mask = Permissions::empty();
    for role in roles {
        mask |= role.permissions;
    }
    if mask.contains(Permissions::ADMINISTRATOR) {
        return Permissions::all();
    }
    mask
}

/// Starting from `effective_server`, apply channel overrides belonging to
/// the user's roles in ascending role `position` order (lowest first) so
/// that the highest-positioned role wins ties.
pub fn effective_channel(roles: &[RoleGrant], overrides: &[ChannelOverride]) -> Permissions {
    let base = effective_server(roles);
    if base.contains(Permissions::ADMINISTRATOR) {
        return Permissions::all();
    }

    let mut sorted: Vec<&RoleGrant> = roles.iter().collect();
    sorted.sort_by_key(|r| r.position);

    let mut mask = base;
    for role in sorted {
        if let Some(ov) = overrides.iter().find(|o| o.role_id == role.role_id) {
            mask = (mask & !ov.deny) | ov.allow;
        }
    }
    mask
}

/// Convenience check used throughout services: `Administrator` always
/// passes; otherwise every bit in `required` must be present.
pub fn can(mask: Permissions, required: Permissions) -> bool {
    mask.contains(Permissions::ADMINISTRATOR) || mask.contains(required)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(position: i32, bits: Permissions) -> RoleGrant {
        RoleGrant { role_id: RoleId::new(), position, permissions: bits }
    }

    #[test]
    fn fails_closed_with_no_roles() {
        assert_eq!(effective_server(&[]), Permissions::empty());
    }

    #[test]
    fn administrator_implies_every_bit() {
        let roles = [grant(0, Permissions::ADMINISTRATOR)];
        assert_eq!(effective_server(&roles), Permissions::all());
    }

    #[test]
    fn higher_position_override_wins_ties() {
        let low = grant(0, Permissions::VIEW_CHANNEL);
        let high = grant(1, Permissions::VIEW_CHANNEL);
        let role_ids = (low.role_id, high.role_id);
        let roles = [low, high];
        let overrides = [
            ChannelOverride { role_id: role_ids.0, allow: Permissions::empty(), deny: Permissions::SEND_MESSAGES },
            ChannelOverride { role_id: role_ids.1, allow: Permissions::SEND_MESSAGES, deny: Permissions::empty() },
        ];
        let result = effective_channel(&roles, &overrides);
        assert!(result.contains(Permissions::SEND_MESSAGES));
    }

    #[test]
    fn deny_override_removes_bit_granted_at_server_scope() {
        let role = grant(0, Permissions::SEND_MESSAGES | Permissions::VIEW_CHANNEL);
        let overrides = [ChannelOverride {
            role_id: role.role_id,
            allow: Permissions::empty(),
            deny: Permissions::SEND_MESSAGES,
        }];
        let result = effective_channel(&[role], &overrides);
        assert!(!result.contains(Permissions::SEND_MESSAGES));
        assert!(result.contains(Permissions::VIEW_CHANNEL));
    }
}
