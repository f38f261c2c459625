//! 用户等级
//!
//! 按 vip → premium → regular 的顺序匹配，第一个满足的等级生效。

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserTier {
    #[default]
    Regular,
    Premium,
    Vip,
}

/// 单个等级的准入门槛（全部为 >=）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierThreshold {
    pub min_orders: i64,
    pub min_spent: f64,
    pub min_success_rate: f64,
}

impl TierThreshold {
    fn admits(&self, orders: i64, spent: f64, success_rate: Option<f64>) -> bool {
        orders >= self.min_orders
            && spent >= self.min_spent
            && success_rate.is_some_and(|rate| rate >= self.min_success_rate)
    }
}

pub const VIP_THRESHOLD: TierThreshold = TierThreshold {
    min_orders: 50,
    min_spent: 5000.0,
    min_success_rate: 80.0,
};

pub const PREMIUM_THRESHOLD: TierThreshold = TierThreshold {
    min_orders: 20,
    min_spent: 2000.0,
    min_success_rate: 70.0,
};

/// 根据累计订单数、消费额和请求成功率计算等级
///
/// 成功率为 None（从未发送请求）时不满足任何门槛。
pub fn classify_tier(orders: i64, spent: f64, success_rate: Option<f64>) -> UserTier {
    if VIP_THRESHOLD.admits(orders, spent, success_rate) {
        UserTier::Vip
    } else if PREMIUM_THRESHOLD.admits(orders, spent, success_rate) {
        UserTier::Premium
    } else {
        UserTier::Regular
    }
}
