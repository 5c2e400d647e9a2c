use adw::Application;
use adw::prelude::*;
use env_logger::Env;

use supportdesk::ui::{self, Surface};
use supportdesk::utils;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let arg = std::env::args().nth(1);
    let Some(surface) = Surface::from_arg(arg.as_deref()) else {
        eprintln!("usage: supportdesk [dashboard|ai-chat|widget]");
        std::process::exit(2);
    };

    // Controller futures run on the GTK main context but need a tokio reactor.
    let _rt = utils::RUNTIME.enter();

    let app = Application::builder()
        .application_id("dev.supportdesk.Client")
        .build();
    app.connect_activate(move |app| {
        ui::build_ui(app, surface);
    });
    // The surface argument is ours; GTK gets no arguments.
    app.run_with_args::<&str>(&[]);
}
