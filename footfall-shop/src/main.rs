use std::net::SocketAddr;

use tokio::net::TcpListener;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut bind_addr: SocketAddr = "127.0.0.1:3000".parse()?;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--bind" => {
                let addr = args.next().ok_or_else(|| {
                    anyhow::anyhow!("--bind requires an address, e.g. 127.0.0.1:3000")
                })?;
                bind_addr = addr.parse()?;
            }
            "-h" | "--help" => {
                eprintln!(
                    "footfall-shop\n\nUSAGE:\n  footfall-shop [--bind 127.0.0.1:3000]\n\nENDPOINTS:\n  GET  /health\n  GET  /api/products\n  POST /api/products\n  GET  /api/products/{{id}}\n  GET  /api/search\n  POST /api/purchase\n  GET  /api/purchases\n\nOUTPUT:\n  Prints SHOP_URL=<url> to stdout once ready."
                );
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("unknown argument: {other}"));
            }
        }
    }

    let listener = TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    let state = footfall_shop::ShopState::new(footfall_shop::FaultProfile::default());
    let app = footfall_shop::router(state);

    println!("SHOP_URL=http://{addr}");

    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
    });

    serve.await?;

    Ok(())
}
