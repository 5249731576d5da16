//! Built-in sample data.
//!
//! Served when the bounties table cannot be reached, and as the only source
//! for winners and activities, which have no upstream table yet.

use std::collections::HashMap;

use crate::types::{Activity, ActivityKind, Bounty, BountyStatus, LeaderboardEntry, Winner};

pub fn sample_bounties() -> Vec<Bounty> {
    vec![
        Bounty {
            id: "sample-1".to_string(),
            title: "Design a Campus Ambassador Logo".to_string(),
            description: "Create a logo for our campus ambassador program that works on merch and social media.".to_string(),
            requirements: "Vector source files (SVG or AI) and a PNG export at 1024px.".to_string(),
            reward: 300.0,
            deadline: "2025-03-31".to_string(),
            category: "Design, Branding".to_string(),
            status: BountyStatus::Open,
            skills: vec!["Illustrator".to_string(), "Figma".to_string()],
            tags: vec!["logo".to_string(), "branding".to_string()],
        },
        Bounty {
            id: "sample-2".to_string(),
            title: "Build a Bounty Leaderboard Widget".to_string(),
            description: "An embeddable widget that shows the top earners of the month.".to_string(),
            requirements: "Public GitHub repository with setup instructions.".to_string(),
            reward: 750.0,
            deadline: "2025-04-15".to_string(),
            category: "Development".to_string(),
            status: BountyStatus::InProgress,
            skills: vec!["TypeScript".to_string(), "React".to_string()],
            tags: vec!["frontend".to_string(), "widget".to_string()],
        },
        Bounty {
            id: "sample-3".to_string(),
            title: "Write a Smart Contract Security Guide".to_string(),
            description: "A beginner friendly article on common smart contract vulnerabilities.".to_string(),
            requirements: "At least 1500 words, published on Medium or Mirror.".to_string(),
            reward: 200.0,
            deadline: "2025-02-28".to_string(),
            category: "Content, Education".to_string(),
            status: BountyStatus::Open,
            skills: vec!["Solidity".to_string(), "Technical Writing".to_string()],
            tags: vec!["security".to_string(), "web3".to_string()],
        },
        Bounty {
            id: "sample-4".to_string(),
            title: "Host a University Hackathon Meetup".to_string(),
            description: "Organize an on-campus meetup introducing students to the bounty platform.".to_string(),
            requirements: "Photos of the event and a short recap post.".to_string(),
            reward: 500.0,
            deadline: "2024-12-15".to_string(),
            category: "Community, Events".to_string(),
            status: BountyStatus::Closed,
            skills: vec!["Event Planning".to_string()],
            tags: vec!["community".to_string(), "meetup".to_string()],
        },
        Bounty {
            id: "sample-5".to_string(),
            title: "UI Design for Mobile Submission Flow".to_string(),
            description: "Redesign the submission flow for small screens.".to_string(),
            requirements: "Figma prototype covering upload, review and confirmation.".to_string(),
            reward: 400.0,
            deadline: "2025-05-01".to_string(),
            category: "Design".to_string(),
            status: BountyStatus::Open,
            skills: vec!["Figma".to_string(), "UX".to_string()],
            tags: vec!["mobile".to_string(), "ui".to_string()],
        },
    ]
}

pub fn sample_winners() -> Vec<Winner> {
    vec![
        Winner {
            id: "winner-1".to_string(),
            name: "Amara Okafor".to_string(),
            university: "University of Lagos".to_string(),
            bounty_title: "Host a University Hackathon Meetup".to_string(),
            reward: 500.0,
            awarded_at: "2024-12-20".to_string(),
        },
        Winner {
            id: "winner-2".to_string(),
            name: "Daniel Park".to_string(),
            university: "KAIST".to_string(),
            bounty_title: "Community Translation Sprint".to_string(),
            reward: 150.0,
            awarded_at: "2024-11-02".to_string(),
        },
        Winner {
            id: "winner-3".to_string(),
            name: "Amara Okafor".to_string(),
            university: "University of Lagos".to_string(),
            bounty_title: "Explainer Video Contest".to_string(),
            reward: 250.0,
            awarded_at: "2024-10-18".to_string(),
        },
        Winner {
            id: "winner-4".to_string(),
            name: "Lucia Fernandez".to_string(),
            university: "Universidad de Buenos Aires".to_string(),
            bounty_title: "Design a Sticker Pack".to_string(),
            reward: 650.0,
            awarded_at: "2024-09-30".to_string(),
        },
    ]
}

pub fn sample_activities() -> Vec<Activity> {
    vec![
        Activity {
            id: "activity-1".to_string(),
            kind: ActivityKind::Submission,
            actor: "Priya Nair".to_string(),
            description: "Submitted work for Design a Campus Ambassador Logo".to_string(),
            timestamp: "2025-01-14T09:30:00Z".to_string(),
        },
        Activity {
            id: "activity-2".to_string(),
            kind: ActivityKind::Win,
            actor: "Amara Okafor".to_string(),
            description: "Won Host a University Hackathon Meetup".to_string(),
            timestamp: "2024-12-20T16:00:00Z".to_string(),
        },
        Activity {
            id: "activity-3".to_string(),
            kind: ActivityKind::NewBounty,
            actor: "Bounty Team".to_string(),
            description: "Posted UI Design for Mobile Submission Flow".to_string(),
            timestamp: "2025-01-10T12:00:00Z".to_string(),
        },
    ]
}

/// Aggregate winners by name: total reward descending, then name.
pub fn leaderboard(winners: &[Winner]) -> Vec<LeaderboardEntry> {
    let mut totals: HashMap<&str, LeaderboardEntry> = HashMap::new();

    for winner in winners {
        let entry = totals
            .entry(winner.name.as_str())
            .or_insert_with(|| LeaderboardEntry {
                rank: 0,
                name: winner.name.clone(),
                university: winner.university.clone(),
                total_reward: 0.0,
                wins: 0,
            });
        entry.total_reward += winner.reward;
        entry.wins += 1;
    }

    let mut entries: Vec<LeaderboardEntry> = totals.into_values().collect();
    entries.sort_by(|a, b| {
        b.total_reward
            .total_cmp(&a.total_reward)
            .then_with(|| a.name.cmp(&b.name))
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    entries
}
