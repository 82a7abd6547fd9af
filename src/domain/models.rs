use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(Debug, Clone, FromRow)]
pub struct Npc {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_gas_holder: bool,
}

/// NPC as shown to players. Never reveals who holds the gas.
#[derive(Debug, Clone, Serialize)]
pub struct PublicNpc {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

impl From<&Npc> for PublicNpc {
    fn from(npc: &Npc) -> Self {
        Self {
            id: npc.id,
            name: npc.name.clone(),
            description: npc.description.clone(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Question {
    pub id: i32,
    pub question_text: String,
    pub difficulty_level: Option<i32>,
    pub correct_answer: String,
    pub options: Json<Vec<String>>,
    pub category: Option<String>,
    pub college_board_aligned: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub question_id: i32,
    pub question_text: String,
    pub difficulty_level: Option<i32>,
    pub options: Vec<String>,
    pub category: Option<String>,
    pub college_board_aligned: bool,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            question_id: q.id,
            question_text: q.question_text.clone(),
            difficulty_level: q.difficulty_level,
            options: q.options.0.clone(),
            category: q.category.clone(),
            college_board_aligned: q.college_board_aligned,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GameSession {
    pub session_id: String,
    pub user_id: Option<i64>,
    #[serde(skip)]
    pub gas_holder_npc_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub attempts_count: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PlayerInteraction {
    pub interaction_id: i64,
    pub session_id: String,
    pub npc_id: i32,
    pub question_id: Option<i32>,
    pub user_answer: Option<String>,
    pub is_correct: Option<bool>,
    pub timestamp: DateTime<Utc>,
    pub response_time_ms: Option<i32>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CandylandCharacter {
    pub character_type: Option<String>,
    pub character_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CandylandScore {
    pub score_type: String,
    pub score_value: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CandylandBadge {
    pub id: i32,
    pub badge_name: String,
    pub badge_icon: String,
}

/// Badge definition joined with how often it was earned and the global attempt
/// counter registered under the same name.
#[derive(Debug, Clone, FromRow)]
pub struct BadgeStats {
    pub id: i32,
    pub badge_name: String,
    pub badge_icon: String,
    pub earned: i64,
    pub attempts: Option<i32>,
}
