#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app_runtime;
mod surface_bridge;
mod ui_dispatch;

fn main() {
    app_runtime::run();
}
