mod app;
mod ui;

use app::GalleryApp;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("albumview=info".parse().unwrap()),
        )
        .init();

    let app = GalleryApp::new();
    std::process::exit(app.run());
}
