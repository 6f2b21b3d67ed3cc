use storefront_core::Config;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    // Initialize the application (database, storage, services, routes)
    let (_state, router) = storefront_api::setup::initialize_app(config.clone()).await?;

    storefront_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
