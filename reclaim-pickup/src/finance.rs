use reclaim_core::Role;
use serde::{Deserialize, Serialize};

pub const USER_SHARE_BPS: i32 = 5_000;
pub const DRIVER_SHARE_BPS: i32 = 1_000;
pub const ENGINEER_SHARE_BPS: i32 = 1_500;
pub const WAREHOUSE_SHARE_BPS: i32 = 2_500;

const TOTAL_BPS: i64 = 10_000;

/// Roles that receive a share of every settled payment, in payout order.
pub const PAYEE_ROLES: [Role; 4] = [Role::User, Role::Driver, Role::Engineer, Role::Warehouse];

/// Basis points owed to a role. Roles outside the split are treated as the
/// pickup owner.
pub fn share_bps(role: Role) -> i32 {
    match role {
        Role::Driver => DRIVER_SHARE_BPS,
        Role::Engineer => ENGINEER_SHARE_BPS,
        Role::Warehouse => WAREHOUSE_SHARE_BPS,
        _ => USER_SHARE_BPS,
    }
}

pub fn share_percentage(role: Role) -> String {
    format!("{}%", share_bps(role) / 100)
}

/// `amount * bps / 10000`, rounded half up.
pub fn share_of(amount: i64, bps: i32) -> i64 {
    let scaled = amount as i128 * bps as i128;
    let half = TOTAL_BPS as i128 / 2;
    let rounded = if scaled >= 0 {
        (scaled + half) / TOTAL_BPS as i128
    } else {
        (scaled - half) / TOTAL_BPS as i128
    };
    rounded as i64
}

/// A payment divided across the four payees, in paise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SplitBreakdown {
    pub user: i64,
    pub driver: i64,
    pub engineer: i64,
    pub warehouse: i64,
}

impl SplitBreakdown {
    /// The user absorbs the rounding remainder so the parts always add up.
    pub fn of(amount: i64) -> Self {
        let driver = share_of(amount, DRIVER_SHARE_BPS);
        let engineer = share_of(amount, ENGINEER_SHARE_BPS);
        let warehouse = share_of(amount, WAREHOUSE_SHARE_BPS);
        Self {
            user: amount - driver - engineer - warehouse,
            driver,
            engineer,
            warehouse,
        }
    }

    pub fn total(&self) -> i64 {
        self.user + self.driver + self.engineer + self.warehouse
    }

    pub fn for_role(&self, role: Role) -> i64 {
        match role {
            Role::Driver => self.driver,
            Role::Engineer => self.engineer,
            Role::Warehouse => self.warehouse,
            _ => self.user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shares_cover_whole_amount() {
        let total: i32 = PAYEE_ROLES.iter().map(|r| share_bps(*r)).sum();
        assert_eq!(total as i64, TOTAL_BPS);
    }

    #[test]
    fn test_split_of_round_amount() {
        let split = SplitBreakdown::of(100_000);
        assert_eq!(split.user, 50_000);
        assert_eq!(split.driver, 10_000);
        assert_eq!(split.engineer, 15_000);
        assert_eq!(split.warehouse, 25_000);
    }

    #[test]
    fn test_split_always_sums_to_amount() {
        for amount in [0, 1, 3, 7, 99, 101, 333, 10_001, 123_457, 9_999_999] {
            let split = SplitBreakdown::of(amount);
            assert_eq!(split.total(), amount, "amount {}", amount);
            assert!(split.user >= 0 && split.driver >= 0);
        }
    }

    #[test]
    fn test_split_rounds_half_up() {
        // 15% of 10_003 = 1500.45 -> 1500, 25% = 2500.75 -> 2501, 10% = 1000.3 -> 1000
        let split = SplitBreakdown::of(10_003);
        assert_eq!(split.engineer, 1_500);
        assert_eq!(split.warehouse, 2_501);
        assert_eq!(split.driver, 1_000);
        assert_eq!(split.user, 5_002);
    }

    #[test]
    fn test_unlisted_roles_fall_back_to_user_share() {
        assert_eq!(share_bps(Role::Recycler), USER_SHARE_BPS);
        assert_eq!(share_percentage(Role::Admin), "50%");
        assert_eq!(share_percentage(Role::Engineer), "15%");
        assert_eq!(SplitBreakdown::of(2_000).for_role(Role::Warehouse), 500);
    }
}
