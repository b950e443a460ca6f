use chrono::{Duration, Utc};
use eticketing_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        Events, Users,
        events::{ActiveModel as EventActive, Column as EventCol},
        users::{ActiveModel as UserActive, Column as UserCol},
    },
    validation::slugify,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "admin@example.com", "Admin", "admin").await?;
    let user_id = ensure_user(&orm, "user@example.com", "Camille", "user").await?;
    seed_events(&orm).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    email: &str,
    first_name: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        first_name: Set(first_name.to_string()),
        customer_ref: Set(None),
        role: Set(role.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;
    Ok(user.id)
}

async fn seed_events(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let events = vec![
        ("Athlétisme - Finale 100m", "Stade de France", 30, Some(500), "price_athle_100m"),
        ("Natation - Relais 4x100m", "Centre Aquatique", 45, Some(250), "price_natation_relais"),
        ("Cérémonie d'ouverture", "Seine", 10, None, "price_ceremonie"),
    ];

    for (name, place, days_ahead, seats, price_ref) in events {
        let slug = slugify(name);
        let exists = Events::find()
            .filter(EventCol::Slug.eq(slug.as_str()))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        EventActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            slug: Set(slug),
            starts_at: Set(Some((Utc::now() + Duration::days(days_ahead)).into())),
            place: Set(place.to_string()),
            description: Set(String::new()),
            seats_available: Set(seats),
            price_ref: Set(price_ref.to_string()),
            created_at: Set(Utc::now().into()),
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded events");
    Ok(())
}
