use folio_core::Config;

// mimalloc keeps fragmentation low under repeated large image buffers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (state, router) = folio_api::setup::initialize_app(config.clone()).await?;

    folio_api::setup::server::start_server(&config, router).await?;

    state.media.shutdown().await;

    Ok(())
}
