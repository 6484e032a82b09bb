mod console;

pub use console::render;
