use schemorm::*;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
}

fn values(v: Value) -> RowValues {
    match v {
        Value::Object(map) => map,
        _ => RowValues::new(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "schemorm=debug,template_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/template.json".to_string());

    let mut db = Database::load(&path, env_resolver)?;
    tracing::info!("loaded {:?}", db);

    db.connect().await?;
    db.reset_models().await?;

    let users = db.model("userx_table")?;
    let posts = db.model("postsx_table")?;

    let new_user = values(json!({ "name": "Ada", "email": "ada@mail.com" }));
    let Some(id) = users.insert_row(false, &new_user).await? else {
        tracing::warn!("user insert was skipped on conflict, not adding a post");
        return Ok(());
    };

    let new_post = values(json!({ "author_id": id, "title": "Notes on the Analytical Engine" }));
    posts.insert_row(false, &new_post).await?;

    let ada: Option<User> = users
        .first_as(&SelectQuery::new().filter("email", "ada@mail.com"))
        .await?;
    tracing::info!("{:?}", ada);

    let renamed = values(json!({ "id": id, "name": "Ada Lovelace", "email": "ada@mail.com" }));
    users.insert_row(true, &renamed).await?;

    let all_users: Vec<User> = users
        .select_as(&SelectQuery::new().order_by(&["name"]).limit(10))
        .await?;
    tracing::info!("All users: {:?}", all_users);

    let all_posts = posts.select(&SelectQuery::new()).await?;
    tracing::info!("All posts: {:?}", all_posts);

    posts.delete_row(&[json!(1)]).await?;

    db.close().await;
    Ok(())
}
