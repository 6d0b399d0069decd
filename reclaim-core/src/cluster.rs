use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::CoreError;

/// One pickup on a cluster's route, visited in `sequence` order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterStop {
    pub pickup_id: Uuid,
    pub user_id: Uuid,
    pub sequence: i32,
}

/// A group of pickups handed to one driver for a single route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionCluster {
    pub id: Uuid,
    pub name: String,
    pub driver_id: Uuid,
    pub engineer_id: Option<Uuid>,
    pub warehouse_id: Uuid,
    pub stops: Vec<ClusterStop>,
    pub created_at: DateTime<Utc>,
}

impl CollectionCluster {
    pub fn new(name: String, driver_id: Uuid, warehouse_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            driver_id,
            engineer_id: None,
            warehouse_id,
            stops: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn add_stop(&mut self, pickup_id: Uuid, user_id: Uuid) {
        let sequence = self.stops.len() as i32 + 1;
        self.stops.push(ClusterStop { pickup_id, user_id, sequence });
    }

    pub fn pickup_ids(&self) -> Vec<Uuid> {
        self.stops.iter().map(|s| s.pickup_id).collect()
    }

    pub fn contains(&self, pickup_id: Uuid) -> bool {
        self.stops.iter().any(|s| s.pickup_id == pickup_id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    InProgress,
    Completed,
}

impl RouteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStatus::InProgress => "in_progress",
            RouteStatus::Completed => "completed",
        }
    }
}

impl FromStr for RouteStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(RouteStatus::InProgress),
            "completed" => Ok(RouteStatus::Completed),
            other => Err(CoreError::ValidationError(format!("Unknown route status: {}", other))),
        }
    }
}

/// A dispatched cluster being driven right now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveRoute {
    pub id: Uuid,
    pub cluster_id: Uuid,
    pub driver_id: Uuid,
    pub status: RouteStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ActiveRoute {
    pub fn start(cluster: &CollectionCluster) -> Self {
        Self {
            id: Uuid::new_v4(),
            cluster_id: cluster.id,
            driver_id: cluster.driver_id,
            status: RouteStatus::InProgress,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn complete(&mut self) -> Result<(), CoreError> {
        if self.status == RouteStatus::Completed {
            return Err(CoreError::Conflict(format!("Route {} already completed", self.id)));
        }
        self.status = RouteStatus::Completed;
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stops_are_numbered_in_order() {
        let mut cluster = CollectionCluster::new("North".into(), Uuid::new_v4(), Uuid::new_v4());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        cluster.add_stop(a, Uuid::new_v4());
        cluster.add_stop(b, Uuid::new_v4());
        assert_eq!(cluster.stops[0].sequence, 1);
        assert_eq!(cluster.stops[1].sequence, 2);
        assert_eq!(cluster.pickup_ids(), vec![a, b]);
        assert!(cluster.contains(b));
    }

    #[test]
    fn test_route_completes_once() {
        let cluster = CollectionCluster::new("South".into(), Uuid::new_v4(), Uuid::new_v4());
        let mut route = ActiveRoute::start(&cluster);
        assert_eq!(route.driver_id, cluster.driver_id);
        route.complete().unwrap();
        assert!(route.completed_at.is_some());
        assert!(route.complete().is_err());
    }
}
