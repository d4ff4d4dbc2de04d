//! # Authorization Guard
//!
//! The single place that decides which roles may perform which drawer actions.
//!
//! ## Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Action        │ Cashier │ Manager │ Staff │ Admin │ SuperAdmin │ Owner │
//! │  ──────────────┼─────────┼─────────┼───────┼───────┼────────────┼────── │
//! │  Open          │   ✓     │   ✓     │  ✓    │  ✓    │    ✓       │  ✓    │
//! │  AddExpense    │   ✓     │   ✓     │  ✓    │  ✓    │    ✓       │  ✓    │
//! │  Close         │   ✓     │   ✓     │  ✓    │  ✓    │    ✓       │  ✓    │
//! │  Reopen        │   ✗     │   ✗     │  ✗    │  ✓    │    ✓       │  ✓    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Authentication is not done here: by the time an [`Actor`] exists its
//! identity has been established and its role resolved.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::Actor;

// =============================================================================
// Role
// =============================================================================

/// A user's role as known to the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Cashier,
    Manager,
    Admin,
    SuperAdmin,
    Owner,
    /// Any role name the policy does not recognise.
    Staff,
}

impl Role {
    /// Parses a role name, ignoring case and `_`, `-` and space separators.
    ///
    /// Unknown names become [`Role::Staff`], which holds no privileges.
    ///
    /// ```rust
    /// use tally_core::auth::Role;
    ///
    /// assert_eq!(Role::from_name("SuperAdmin"), Role::SuperAdmin);
    /// assert_eq!(Role::from_name("super_admin"), Role::SuperAdmin);
    /// assert_eq!(Role::from_name("OWNER"), Role::Owner);
    /// assert_eq!(Role::from_name("stock clerk"), Role::Staff);
    /// ```
    pub fn from_name(name: &str) -> Role {
        let normalized: String = name
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "cashier" => Role::Cashier,
            "manager" => Role::Manager,
            "admin" => Role::Admin,
            "superadmin" => Role::SuperAdmin,
            "owner" => Role::Owner,
            _ => Role::Staff,
        }
    }

    /// Returns true for the roles allowed to perform privileged actions.
    #[inline]
    pub const fn is_privileged(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin | Role::Owner)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Cashier => "cashier",
            Role::Manager => "manager",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
            Role::Owner => "owner",
            Role::Staff => "staff",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Action
// =============================================================================

/// A state-changing drawer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Open,
    AddExpense,
    Close,
    Reopen,
}

impl Action {
    /// Only reopening a closed day is privileged.
    #[inline]
    pub const fn is_privileged(&self) -> bool {
        matches!(self, Action::Reopen)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Open => "open",
            Action::AddExpense => "add_expense",
            Action::Close => "close",
            Action::Reopen => "reopen",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Policy
// =============================================================================

/// Returns whether `role` may perform `action`. Pure.
#[inline]
pub const fn allows(role: Role, action: Action) -> bool {
    !action.is_privileged() || role.is_privileged()
}

/// Checks the policy for an actor, returning `Unauthorized` on denial.
pub fn authorize(actor: &Actor, action: Action) -> CoreResult<()> {
    if allows(actor.role, action) {
        Ok(())
    } else {
        Err(CoreError::Unauthorized {
            actor: actor.id.clone(),
            role: actor.role,
            action,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
