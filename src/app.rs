use gtk4::prelude::*;
use gtk4::Application;
use std::rc::Rc;
use tracing::error;

use albumview::{GalleryConfig, GalleryContext};

use crate::ui::MainWindow;

const APP_ID: &str = "com.albumview.Gallery";

pub struct GalleryApp {
    app: Application,
}

impl GalleryApp {
    pub fn new() -> Self {
        let app = Application::builder().application_id(APP_ID).build();

        app.connect_activate(Self::on_activate);

        Self { app }
    }

    pub fn run(&self) -> i32 {
        self.app.run().into()
    }

    fn on_activate(app: &Application) {
        // A second launch re-activates the running instance.
        if let Some(window) = app.active_window() {
            window.present();
            return;
        }

        let config = GalleryConfig::from_env();
        match GalleryContext::new(config) {
            Ok(ctx) => {
                let window = MainWindow::new(app, Rc::new(ctx));
                window.present();
            }
            Err(e) => {
                error!(error = %e, "Failed to start the gallery");
            }
        }
    }
}

impl Default for GalleryApp {
    fn default() -> Self {
        Self::new()
    }
}
