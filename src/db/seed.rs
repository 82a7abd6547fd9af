use crate::domain::models::UserRole;
use crate::web::session::hash_password;
use anyhow::Result;
use serde_json::json;
use sqlx::PgPool;

struct SeedNpc<'a> {
    name: &'a str,
    description: &'a str,
}

struct SeedQuestion<'a> {
    text: &'a str,
    answer: &'a str,
    options: &'a [&'a str],
    difficulty: i32,
    category: &'a str,
    aligned: bool,
}

pub async fn seed_all(pool: &PgPool, admin_uid: &str, admin_password: Option<&str>) -> Result<()> {
    seed_npcs(pool).await?;
    seed_questions(pool).await?;
    if let Some(password) = admin_password {
        seed_admin(pool, admin_uid, password).await?;
    }
    Ok(())
}

async fn seed_admin(pool: &PgPool, uid: &str, password: &str) -> Result<()> {
    let hash = hash_password(password)?;
    sqlx::query(
        r#"
        INSERT INTO users (uid, name, hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (uid) DO NOTHING
        "#,
    )
    .bind(uid)
    .bind("Administrator")
    .bind(hash)
    .bind(UserRole::Admin)
    .execute(pool)
    .await?;
    Ok(())
}

async fn seed_npcs(pool: &PgPool) -> Result<()> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM npcs")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(());
    }

    let npcs = [
        SeedNpc { name: "Librarian", description: "Knows every book in the stacks and every rumor in the halls." },
        SeedNpc { name: "Janitor", description: "Has keys to every room and a suspicious whistle." },
        SeedNpc { name: "Chemistry Teacher", description: "Smells faintly of sulfur. Always has a beaker nearby." },
        SeedNpc { name: "Cafeteria Cook", description: "Serves bean burrito Tuesdays without remorse." },
        SeedNpc { name: "Band Kid", description: "Tuba practice runs long after the bell." },
        SeedNpc { name: "Principal", description: "Watches the hallways from the front office." },
    ];

    for npc in npcs {
        sqlx::query("INSERT INTO npcs (name, description) VALUES ($1, $2)")
            .bind(npc.name)
            .bind(npc.description)
            .execute(pool)
            .await?;
    }
    tracing::info!("Seeded NPCs");
    Ok(())
}

async fn seed_questions(pool: &PgPool) -> Result<()> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM question_pool")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(());
    }

    let questions = [
        SeedQuestion {
            text: "What is the value of 7 / 2 in Java when both operands are int?",
            answer: "3",
            options: &["3", "3.5", "4", "3.0"],
            difficulty: 1,
            category: "Primitive Types",
            aligned: true,
        },
        SeedQuestion {
            text: "Which keyword creates a new object in Java?",
            answer: "new",
            options: &["create", "new", "make", "alloc"],
            difficulty: 1,
            category: "Using Objects",
            aligned: true,
        },
        SeedQuestion {
            text: "What does \"hello\".substring(1, 3) return?",
            answer: "el",
            options: &["he", "el", "ell", "llo"],
            difficulty: 2,
            category: "Using Objects",
            aligned: true,
        },
        SeedQuestion {
            text: "What is the index of the last element in an array of length n?",
            answer: "n - 1",
            options: &["n", "n - 1", "n + 1", "0"],
            difficulty: 1,
            category: "Array",
            aligned: true,
        },
        SeedQuestion {
            text: "Which ArrayList method returns the number of elements?",
            answer: "size()",
            options: &["length", "length()", "size()", "count()"],
            difficulty: 2,
            category: "ArrayList",
            aligned: true,
        },
        SeedQuestion {
            text: "How many times does for (int i = 0; i < 10; i += 3) execute its body?",
            answer: "4",
            options: &["3", "4", "10", "9"],
            difficulty: 2,
            category: "Iteration",
            aligned: true,
        },
        SeedQuestion {
            text: "What does !(a && b) equal by De Morgan's law?",
            answer: "!a || !b",
            options: &["!a && !b", "!a || !b", "a || b", "a && !b"],
            difficulty: 3,
            category: "Boolean Expressions",
            aligned: true,
        },
        SeedQuestion {
            text: "Which gas makes up most of Earth's atmosphere?",
            answer: "Nitrogen",
            options: &["Oxygen", "Nitrogen", "Carbon dioxide", "Argon"],
            difficulty: 1,
            category: "Trivia",
            aligned: false,
        },
    ];

    for q in questions {
        sqlx::query(
            r#"
            INSERT INTO question_pool
                (question_text, correct_answer, options, difficulty_level, category, college_board_aligned)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(q.text)
        .bind(q.answer)
        .bind(json!(q.options))
        .bind(q.difficulty)
        .bind(q.category)
        .bind(q.aligned)
        .execute(pool)
        .await?;
    }
    tracing::info!("Seeded question pool");
    Ok(())
}
