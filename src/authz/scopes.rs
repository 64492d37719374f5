use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Resource area a scope belongs to, used to group scopes for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScopeArea {
    Admin,
    Users,
    Roles,
    Schedules,
    Shifts,
    Alerts,
    Inventory,
    Restocks,
}

/// A permission tag gating one category of action.
///
/// Serialized as its snake_case name (`GetOwnShift` is `"get_own_shift"`),
/// which is also the value stored in `role_scopes.scope`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Admin,

    GetUsers,
    CreateUser,
    UpdateUser,
    UpdateSelf,
    DeleteUser,
    DeleteSelf,
    GrantRole,

    GetRoles,
    CreateRole,
    UpdateRole,
    DeleteRole,

    GetSchedules,
    GetOneSchedule,
    GetCurrentSchedule,
    GetPublicSchedule,
    CreateSchedule,
    UpdateSchedule,
    DeleteSchedule,

    GetShifts,
    GetOwnShift,
    GetUserDroppedShifts,
    GetUserPickedUpShifts,
    CreateShift,
    UpdateShift,
    DeleteShift,
    PostShiftEvent,

    CreateAlert,
    UpdateAlert,
    DeleteAlert,

    GetInventory,
    GetPublicInventory,
    CreateItem,
    UpdateItem,
    DeleteItem,

    GetRestockRequests,
    GetUserRestockRequests,
    GetOwnRestockRequests,
    CreateRestockRequest,
    UpdateRestockRequest,
    UpdateRestockStatus,
    DeleteRestockRequest,
}

/// Registry entry describing one scope.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct ScopeDefinition {
    pub scope: Scope,
    pub area: ScopeArea,
    #[schema(example = "Get Own Shifts")]
    pub label: &'static str,
    #[schema(example = "Allows a user to view the shifts assigned to them")]
    pub description: &'static str,
}

const fn def(
    scope: Scope,
    area: ScopeArea,
    label: &'static str,
    description: &'static str,
) -> ScopeDefinition {
    ScopeDefinition { scope, area, label, description }
}

pub const REGISTRY: &[ScopeDefinition] = &[
    def(Scope::Admin, ScopeArea::Admin, "Admin", "Grants every scope"),
    // Users
    def(Scope::GetUsers, ScopeArea::Users, "Get Users", "Allows a user to view every user"),
    def(Scope::CreateUser, ScopeArea::Users, "Create User", "Allows a user to create users"),
    def(Scope::UpdateUser, ScopeArea::Users, "Update User", "Allows a user to update any user"),
    def(Scope::UpdateSelf, ScopeArea::Users, "Update Self", "Allows a user to update their own information"),
    def(Scope::DeleteUser, ScopeArea::Users, "Delete User", "Allows a user to delete any user"),
    def(Scope::DeleteSelf, ScopeArea::Users, "Delete Self", "Allows a user to delete their own account"),
    def(Scope::GrantRole, ScopeArea::Users, "Grant Role", "Allows a user to grant and revoke roles"),
    // Roles
    def(Scope::GetRoles, ScopeArea::Roles, "Get Roles", "Allows a user to view every role"),
    def(Scope::CreateRole, ScopeArea::Roles, "Create Role", "Allows a user to create roles"),
    def(Scope::UpdateRole, ScopeArea::Roles, "Update Role", "Allows a user to update roles"),
    def(Scope::DeleteRole, ScopeArea::Roles, "Delete Role", "Allows a user to delete roles"),
    // Schedules
    def(Scope::GetSchedules, ScopeArea::Schedules, "Get Schedules", "Allows a user to view every schedule"),
    def(Scope::GetOneSchedule, ScopeArea::Schedules, "Get One Schedule", "Allows a user to view a schedule by uuid"),
    def(Scope::GetCurrentSchedule, ScopeArea::Schedules, "Get Current Schedule", "Allows a user to view the current schedule"),
    def(Scope::GetPublicSchedule, ScopeArea::Schedules, "Get Public Schedule", "Allows a user to view the public version of the current schedule"),
    def(Scope::CreateSchedule, ScopeArea::Schedules, "Create Schedule", "Allows a user to create schedules"),
    def(Scope::UpdateSchedule, ScopeArea::Schedules, "Update Schedule", "Allows a user to update schedules, including their shifts and alerts"),
    def(Scope::DeleteSchedule, ScopeArea::Schedules, "Delete Schedule", "Allows a user to delete schedules"),
    // Shifts
    def(Scope::GetShifts, ScopeArea::Shifts, "Get Shifts", "Allows a user to view the shifts of any user"),
    def(Scope::GetOwnShift, ScopeArea::Shifts, "Get Own Shifts", "Allows a user to view the shifts assigned to them"),
    def(Scope::GetUserDroppedShifts, ScopeArea::Shifts, "Get Dropped Shifts", "Allows a user to view the shifts any user dropped"),
    def(Scope::GetUserPickedUpShifts, ScopeArea::Shifts, "Get Picked Up Shifts", "Allows a user to view the shifts any user picked up"),
    def(Scope::CreateShift, ScopeArea::Shifts, "Create Shift", "Allows a user to add shifts to a schedule"),
    def(Scope::UpdateShift, ScopeArea::Shifts, "Update Shift", "Allows a user to update shifts in a schedule"),
    def(Scope::DeleteShift, ScopeArea::Shifts, "Delete Shift", "Allows a user to remove shifts from a schedule"),
    def(Scope::PostShiftEvent, ScopeArea::Shifts, "Post Shift Event", "Allows a user to drop, pick up or check into shifts"),
    // Alerts
    def(Scope::CreateAlert, ScopeArea::Alerts, "Create Alert", "Allows a user to add alerts to a schedule"),
    def(Scope::UpdateAlert, ScopeArea::Alerts, "Update Alert", "Allows a user to update alerts in a schedule"),
    def(Scope::DeleteAlert, ScopeArea::Alerts, "Delete Alert", "Allows a user to remove alerts from a schedule"),
    // Inventory
    def(Scope::GetInventory, ScopeArea::Inventory, "Get Inventory", "Allows a user to view every inventory item with its reorder details"),
    def(Scope::GetPublicInventory, ScopeArea::Inventory, "Get Public Inventory", "Allows a user to view the public version of the inventory"),
    def(Scope::CreateItem, ScopeArea::Inventory, "Create Item", "Allows a user to add inventory items"),
    def(Scope::UpdateItem, ScopeArea::Inventory, "Update Item", "Allows a user to update inventory items and their locations"),
    def(Scope::DeleteItem, ScopeArea::Inventory, "Delete Item", "Allows a user to delete inventory items"),
    // Restocks
    def(Scope::GetRestockRequests, ScopeArea::Restocks, "Get Restock Requests", "Allows a user to view every restock request"),
    def(Scope::GetUserRestockRequests, ScopeArea::Restocks, "Get User Restock Requests", "Allows a user to view the restock requests of any user"),
    def(Scope::GetOwnRestockRequests, ScopeArea::Restocks, "Get Own Restock Requests", "Allows a user to view their own restock requests"),
    def(Scope::CreateRestockRequest, ScopeArea::Restocks, "Create Restock Request", "Allows a user to submit restock requests"),
    def(Scope::UpdateRestockRequest, ScopeArea::Restocks, "Update Restock Request", "Allows a user to edit restock requests"),
    def(Scope::UpdateRestockStatus, ScopeArea::Restocks, "Update Restock Status", "Allows a user to approve, deny and complete restock requests"),
    def(Scope::DeleteRestockRequest, ScopeArea::Restocks, "Delete Restock Request", "Allows a user to delete restock requests"),
];

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Admin => "admin",
            Scope::GetUsers => "get_users",
            Scope::CreateUser => "create_user",
            Scope::UpdateUser => "update_user",
            Scope::UpdateSelf => "update_self",
            Scope::DeleteUser => "delete_user",
            Scope::DeleteSelf => "delete_self",
            Scope::GrantRole => "grant_role",
            Scope::GetRoles => "get_roles",
            Scope::CreateRole => "create_role",
            Scope::UpdateRole => "update_role",
            Scope::DeleteRole => "delete_role",
            Scope::GetSchedules => "get_schedules",
            Scope::GetOneSchedule => "get_one_schedule",
            Scope::GetCurrentSchedule => "get_current_schedule",
            Scope::GetPublicSchedule => "get_public_schedule",
            Scope::CreateSchedule => "create_schedule",
            Scope::UpdateSchedule => "update_schedule",
            Scope::DeleteSchedule => "delete_schedule",
            Scope::GetShifts => "get_shifts",
            Scope::GetOwnShift => "get_own_shift",
            Scope::GetUserDroppedShifts => "get_user_dropped_shifts",
            Scope::GetUserPickedUpShifts => "get_user_picked_up_shifts",
            Scope::CreateShift => "create_shift",
            Scope::UpdateShift => "update_shift",
            Scope::DeleteShift => "delete_shift",
            Scope::PostShiftEvent => "post_shift_event",
            Scope::CreateAlert => "create_alert",
            Scope::UpdateAlert => "update_alert",
            Scope::DeleteAlert => "delete_alert",
            Scope::GetInventory => "get_inventory",
            Scope::GetPublicInventory => "get_public_inventory",
            Scope::CreateItem => "create_item",
            Scope::UpdateItem => "update_item",
            Scope::DeleteItem => "delete_item",
            Scope::GetRestockRequests => "get_restock_requests",
            Scope::GetUserRestockRequests => "get_user_restock_requests",
            Scope::GetOwnRestockRequests => "get_own_restock_requests",
            Scope::CreateRestockRequest => "create_restock_request",
            Scope::UpdateRestockRequest => "update_restock_request",
            Scope::UpdateRestockStatus => "update_restock_status",
            Scope::DeleteRestockRequest => "delete_restock_request",
        }
    }

    pub fn definition(&self) -> &'static ScopeDefinition {
        // every variant has exactly one registry entry (see tests)
        REGISTRY
            .iter()
            .find(|d| d.scope == *self)
            .unwrap_or(&REGISTRY[0])
    }

    pub fn label(&self) -> &'static str {
        self.definition().label
    }

    pub fn area(&self) -> ScopeArea {
        self.definition().area
    }

    pub fn all() -> impl Iterator<Item = Scope> {
        REGISTRY.iter().map(|d| d.scope)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown scope `{0}`")]
pub struct UnknownScope(pub String);

impl FromStr for Scope {
    type Err = UnknownScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scope::all()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| UnknownScope(s.to_string()))
    }
}

/// The flattened scopes granted to one identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeSet(HashSet<Scope>);

impl ScopeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, scope: Scope) -> bool {
        self.0.contains(&scope)
    }

    pub fn is_admin(&self) -> bool {
        self.contains(Scope::Admin)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn insert(&mut self, scope: Scope) -> bool {
        self.0.insert(scope)
    }

    /// Sorted by registry order, for stable responses.
    pub fn to_sorted_vec(&self) -> Vec<Scope> {
        Scope::all().filter(|s| self.contains(*s)).collect()
    }
}

impl FromIterator<Scope> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = Scope>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Scope> for ScopeSet {
    fn extend<I: IntoIterator<Item = Scope>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_each_scope_once() {
        let mut seen = HashSet::new();
        for d in REGISTRY {
            assert!(seen.insert(d.scope), "{} registered twice", d.scope);
        }
        // a scope missing from the registry would not round-trip through FromStr
        for d in REGISTRY {
            assert_eq!(d.scope.as_str().parse::<Scope>().unwrap(), d.scope);
        }
    }

    #[test]
    fn serde_name_matches_stored_name() {
        for scope in Scope::all() {
            let json = serde_json::to_value(scope).unwrap();
            assert_eq!(json, serde_json::Value::String(scope.as_str().to_string()));
        }
    }

    #[test]
    fn unknown_scope_is_rejected() {
        assert!("launch_missiles".parse::<Scope>().is_err());
    }

    #[test]
    fn admin_detection() {
        let set: ScopeSet = [Scope::GetShifts].into_iter().collect();
        assert!(!set.is_admin());
        let set: ScopeSet = [Scope::GetShifts, Scope::Admin].into_iter().collect();
        assert!(set.is_admin());
    }

    #[test]
    fn sorted_vec_follows_registry_order() {
        let set: ScopeSet = [Scope::DeleteAlert, Scope::Admin, Scope::GetUsers]
            .into_iter()
            .collect();
        assert_eq!(set.to_sorted_vec(), vec![Scope::Admin, Scope::GetUsers, Scope::DeleteAlert]);
    }
}
