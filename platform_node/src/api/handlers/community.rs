use axum::Json;
use serde::Serialize;

use crate::fallback::{self, sample_activities, sample_winners};
use crate::types::{Activity, LeaderboardEntry, Winner};

#[derive(Debug, Serialize)]
pub struct WinnersResponse {
    pub winners: Vec<Winner>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ActivitiesResponse {
    pub activities: Vec<Activity>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub count: usize,
}

pub async fn list_winners() -> Json<WinnersResponse> {
    let winners = sample_winners();
    Json(WinnersResponse {
        count: winners.len(),
        winners,
    })
}

pub async fn list_activities() -> Json<ActivitiesResponse> {
    let activities = sample_activities();
    Json(ActivitiesResponse {
        count: activities.len(),
        activities,
    })
}

/// Winners aggregated by name
pub async fn leaderboard() -> Json<LeaderboardResponse> {
    let leaderboard = fallback::leaderboard(&sample_winners());
    Json(LeaderboardResponse {
        count: leaderboard.len(),
        leaderboard,
    })
}
