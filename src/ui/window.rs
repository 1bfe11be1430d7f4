// Main window for the gallery
// GTK4 ApplicationWindow with a Stack of three pages: album picker,
// thumbnail grid and full-image viewer

use gdk4::{MemoryFormat, MemoryTexture, Texture};
use glib::ControlFlow;
use gtk4::prelude::*;
use gtk4::{
    Align, Application, ApplicationWindow, Box as GtkBox, Button, ContentFit, Grid, Label,
    Orientation, Picture, ScrolledWindow, Stack, StackTransitionType,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, warn};

use super::keybindings::Keybindings;
use albumview::full_image::FullImageResult;
use albumview::image_loader::DecodedImage;
use albumview::models::ImageEntry;
use albumview::{GalleryContext, NavAction, NavigationController, Screen};

const WINDOW_TITLE: &str = "Image Gallery";
const DEFAULT_WIDTH: i32 = 800;
const DEFAULT_HEIGHT: i32 = 600;
const PAGE_SPACING: i32 = 20;
const GRID_SPACING: i32 = 10;

/// Interval for delivering finished thumbnails on the main thread.
const BATCH_UPDATE_MS: u64 = 16; // ~60fps

const PAGE_ALBUMS: &str = "albums";
const PAGE_GRID: &str = "grid";
const PAGE_VIEWER: &str = "viewer";

fn page_name(screen: Screen) -> &'static str {
    match screen {
        Screen::AlbumSelect => PAGE_ALBUMS,
        Screen::ThumbnailGrid => PAGE_GRID,
        Screen::FullImage => PAGE_VIEWER,
    }
}

fn texture_from_image(image: &DecodedImage) -> Texture {
    let bytes = glib::Bytes::from(&image.pixels[..]);
    MemoryTexture::new(
        image.width as i32,
        image.height as i32,
        MemoryFormat::R8g8b8a8,
        &bytes,
        image.stride(),
    )
    .upcast()
}

/// Widgets and state shared by every signal handler.
struct Shell {
    ctx: Rc<GalleryContext>,
    nav: RefCell<NavigationController>,
    stack: Stack,
    album_status: Label,
    grid_title: Label,
    grid_scroller: ScrolledWindow,
    viewer_picture: Picture,
    viewer_caption: Label,
    prev_button: Button,
    next_button: Button,
}

pub struct MainWindow {
    window: ApplicationWindow,
}

impl MainWindow {
    pub fn new(app: &Application, ctx: Rc<GalleryContext>) -> Self {
        let stack = Stack::builder()
            .transition_type(StackTransitionType::Crossfade)
            .build();

        // Album picker
        let album_page = GtkBox::new(Orientation::Vertical, PAGE_SPACING);
        album_page.set_valign(Align::Center);
        album_page.set_halign(Align::Center);
        let heading = Label::new(Some("Select an Album"));
        heading.add_css_class("title-1");
        let album_buttons = GtkBox::new(Orientation::Horizontal, PAGE_SPACING);
        album_buttons.set_halign(Align::Center);
        let album_status = Label::new(None);
        album_status.add_css_class("error");
        album_status.set_wrap(true);
        album_page.append(&heading);
        album_page.append(&album_buttons);
        album_page.append(&album_status);

        // Thumbnail grid
        let grid_page = GtkBox::new(Orientation::Vertical, GRID_SPACING);
        set_margins(&grid_page, GRID_SPACING);
        let grid_title = Label::new(None);
        grid_title.add_css_class("title-2");
        let grid_scroller = ScrolledWindow::builder()
            .vexpand(true)
            .hexpand(true)
            .build();
        let grid_back = Button::with_label("Back to Albums");
        grid_back.set_halign(Align::Center);
        grid_page.append(&grid_title);
        grid_page.append(&grid_scroller);
        grid_page.append(&grid_back);

        // Full-image viewer
        let viewer_page = GtkBox::new(Orientation::Vertical, GRID_SPACING);
        set_margins(&viewer_page, GRID_SPACING);
        let viewer_picture = Picture::new();
        viewer_picture.set_content_fit(ContentFit::Contain);
        viewer_picture.set_vexpand(true);
        viewer_picture.set_hexpand(true);
        let viewer_caption = Label::new(None);
        let controls = GtkBox::new(Orientation::Horizontal, GRID_SPACING);
        controls.set_halign(Align::Center);
        let prev_button = Button::with_label("Previous");
        let viewer_back = Button::with_label("Back to Thumbnails");
        let next_button = Button::with_label("Next");
        controls.append(&prev_button);
        controls.append(&viewer_back);
        controls.append(&next_button);
        viewer_page.append(&viewer_picture);
        viewer_page.append(&viewer_caption);
        viewer_page.append(&controls);

        stack.add_named(&album_page, Some(PAGE_ALBUMS));
        stack.add_named(&grid_page, Some(PAGE_GRID));
        stack.add_named(&viewer_page, Some(PAGE_VIEWER));
        stack.set_visible_child_name(PAGE_ALBUMS);

        let window = ApplicationWindow::builder()
            .application(app)
            .title(WINDOW_TITLE)
            .default_width(DEFAULT_WIDTH)
            .default_height(DEFAULT_HEIGHT)
            .child(&stack)
            .build();

        let shell = Rc::new(Shell {
            ctx,
            nav: RefCell::new(NavigationController::new()),
            stack,
            album_status,
            grid_title,
            grid_scroller,
            viewer_picture,
            viewer_caption,
            prev_button,
            next_button,
        });

        for name in shell.ctx.registry.list_albums() {
            let button = Button::with_label(name);
            let shell_clone = shell.clone();
            let name = name.to_string();
            button.connect_clicked(move |_| shell_clone.open_album(&name));
            album_buttons.append(&button);
        }

        let shell_clone = shell.clone();
        grid_back.connect_clicked(move |_| {
            shell_clone.handle_action(NavAction::Back);
        });
        let shell_clone = shell.clone();
        viewer_back.connect_clicked(move |_| {
            shell_clone.handle_action(NavAction::Back);
        });
        let shell_clone = shell.clone();
        shell.prev_button.connect_clicked(move |_| {
            shell_clone.handle_action(NavAction::Previous);
        });
        let shell_clone = shell.clone();
        shell.next_button.connect_clicked(move |_| {
            shell_clone.handle_action(NavAction::Next);
        });

        let keybindings = Keybindings::new();
        let shell_clone = shell.clone();
        keybindings.connect_action(move |action| shell_clone.handle_action(action));
        keybindings.attach(&window);

        Self::start_thumbnail_dispatch(&shell);
        Self::start_full_image_receiver(&shell);

        Self { window }
    }

    pub fn present(&self) {
        self.window.present();
    }

    /// Deliver finished thumbnails on the main thread at a steady cadence.
    fn start_thumbnail_dispatch(shell: &Rc<Shell>) {
        let shell_weak = Rc::downgrade(shell);
        glib::timeout_add_local(Duration::from_millis(BATCH_UPDATE_MS), move || {
            match shell_weak.upgrade() {
                Some(shell) => {
                    shell.ctx.thumbnails.dispatch_completed();
                    ControlFlow::Continue
                }
                None => ControlFlow::Break,
            }
        });
        debug!("Started thumbnail dispatch");
    }

    /// Apply full-resolution decodes as they arrive.
    fn start_full_image_receiver(shell: &Rc<Shell>) {
        let receiver = shell.ctx.full_images.results();
        let shell_weak = Rc::downgrade(shell);
        glib::spawn_future_local(async move {
            while let Ok(result) = receiver.recv().await {
                if let Some(shell) = shell_weak.upgrade() {
                    shell.apply_full_image(result);
                } else {
                    // Window was dropped, exit the loop
                    break;
                }
            }
        });
    }
}

impl Shell {
    fn open_album(self: &Rc<Self>, name: &str) {
        let opened = self
            .nav
            .borrow_mut()
            .select_album(&self.ctx.registry, name)
            .map(|images| images.to_vec());

        match opened {
            Ok(images) => {
                self.album_status.set_text("");
                self.build_grid(name, &images);
                self.show(Screen::ThumbnailGrid);
            }
            // Already logged by the controller; stay on the picker.
            Err(e) if e.is_configuration() => {
                self.album_status.set_text(&e.to_string());
            }
            Err(e) => {
                warn!(album = name, error = %e, "Unexpected error opening album");
                self.album_status
                    .set_text(&format!("Could not open album \"{}\"", name));
            }
        }
    }

    /// Replace the grid with one cell per image and request every thumbnail.
    ///
    /// Each cell carries its own index, so clicks never search the list.
    fn build_grid(self: &Rc<Self>, name: &str, images: &[ImageEntry]) {
        self.grid_title.set_text(name);

        let grid = Grid::builder()
            .row_spacing(GRID_SPACING)
            .column_spacing(GRID_SPACING)
            .halign(Align::Center)
            .build();

        let columns = self.ctx.config.grid_columns.max(1) as usize;
        let cell_size = self.ctx.config.thumb_width as i32;

        for (index, entry) in images.iter().enumerate() {
            let picture = Picture::new();
            picture.set_content_fit(ContentFit::Contain);
            picture.set_size_request(cell_size, cell_size);

            let button = Button::builder()
                .child(&picture)
                .tooltip_text(entry.file_name())
                .build();
            let shell_weak = Rc::downgrade(self);
            button.connect_clicked(move |_| {
                if let Some(shell) = shell_weak.upgrade() {
                    shell.open_image(index);
                }
            });

            grid.attach(
                &button,
                (index % columns) as i32,
                (index / columns) as i32,
                1,
                1,
            );

            let picture_weak = picture.downgrade();
            self.ctx.thumbnails.load(&entry.path, move |result| {
                // Failed decodes leave the cell blank.
                let Some(thumbnail) = result.thumbnail() else {
                    return;
                };
                if let Some(picture) = picture_weak.upgrade() {
                    picture.set_paintable(Some(&texture_from_image(thumbnail)));
                }
            });
        }

        self.grid_scroller.set_child(Some(&grid));
    }

    fn open_image(&self, index: usize) {
        let opened = self.nav.borrow_mut().select_thumbnail(index).map(|_| ());
        match opened {
            Ok(()) => {
                self.show_current_image();
                self.show(Screen::FullImage);
            }
            Err(e) => warn!(index, error = %e, "Could not open image"),
        }
    }

    /// Returns whether the action was consumed.
    fn handle_action(&self, action: NavAction) -> bool {
        let applied = self.nav.borrow_mut().apply(action);
        match applied {
            Ok(changed) => {
                if changed {
                    let screen = self.nav.borrow().screen();
                    if screen == Screen::FullImage {
                        self.show_current_image();
                    }
                    self.show(screen);
                }
                changed
            }
            Err(_) => false,
        }
    }

    /// Show the cached thumbnail right away and queue the full decode.
    fn show_current_image(&self) {
        let nav = self.nav.borrow();
        let Some(entry) = nav.current_image() else {
            return;
        };
        let index = nav.current_index();
        let total = nav.images().len();

        self.viewer_caption
            .set_text(&format!("{} ({} / {})", entry.file_name(), index + 1, total));
        self.prev_button.set_sensitive(index > 0);
        self.next_button.set_sensitive(index + 1 < total);

        let preview = self
            .ctx
            .thumbnails
            .cache()
            .get(&entry.path)
            .map(|thumbnail| texture_from_image(&thumbnail));
        self.viewer_picture.set_paintable(preview.as_ref());

        self.ctx.full_images.request(&entry.path);
    }

    fn apply_full_image(&self, result: FullImageResult) {
        if !self.ctx.full_images.is_current(result.generation) {
            return;
        }
        match result.outcome {
            Ok(image) => {
                self.viewer_picture
                    .set_paintable(Some(&texture_from_image(&image)));
            }
            Err(e) => {
                self.viewer_caption.set_text(&e.to_string());
            }
        }
    }

    fn show(&self, screen: Screen) {
        if screen != Screen::FullImage {
            self.ctx.full_images.invalidate();
        }
        self.stack.set_visible_child_name(page_name(screen));
    }
}

fn set_margins(widget: &impl IsA<gtk4::Widget>, margin: i32) {
    widget.set_margin_top(margin);
    widget.set_margin_bottom(margin);
    widget.set_margin_start(margin);
    widget.set_margin_end(margin);
}
