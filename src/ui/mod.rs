mod keybindings;
mod window;

pub use window::MainWindow;
