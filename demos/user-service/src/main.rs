use user_service::user::v1::{Profile, User};
use user_service::{app, Directory};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let directory = Directory::with_users([User {
        id: 1,
        name: "ada".to_string(),
        profile: Some(Profile {
            bio: "analyst".to_string(),
        }),
    }]);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    axum::serve(listener, app(directory)).await?;
    Ok(())
}
