//! libadwaita windows for each surface. Controllers run on the GTK main context;
//! the push channel task lives on the shared tokio runtime.

pub mod ai_chat_window;
pub mod chat_view;
pub mod login;
pub mod main_window;
pub mod sidebar;
pub mod widget_window;

use adw::Application;
use gtk4 as gtk;
use gtk4::prelude::*;
use std::cell::Cell;
use std::rc::Rc;

use crate::app::AppConfig;
use crate::storage::LocalStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Dashboard,
    AiChat,
    Widget,
}

impl Surface {
    pub fn from_arg(arg: Option<&str>) -> Option<Self> {
        match arg.unwrap_or("dashboard") {
            "dashboard" => Some(Surface::Dashboard),
            "ai-chat" => Some(Surface::AiChat),
            "widget" => Some(Surface::Widget),
            _ => None,
        }
    }
}

pub fn build_ui(app: &Application, surface: Surface) {
    let config = AppConfig::load();
    let store = match LocalStore::open_default() {
        Ok(store) => Rc::new(store),
        Err(e) => {
            log::error!("failed to open local store: {}", e);
            return;
        }
    };

    match surface {
        Surface::Widget => widget_window::show_widget_window(app, &config, store),
        Surface::Dashboard | Surface::AiChat if store.token().is_none() => {
            login::show_login_window(app, config, store, surface)
        }
        Surface::Dashboard => main_window::show_main_window(app, &config, store),
        Surface::AiChat => ai_chat_window::show_ai_chat_window(app, &config, store),
    }
}

/// Modal OK/Cancel question resolved asynchronously.
#[allow(deprecated)]
pub async fn confirm(parent: &impl IsA<gtk::Window>, prompt: &str) -> bool {
    let dialog = gtk::MessageDialog::builder()
        .transient_for(parent)
        .modal(true)
        .message_type(gtk::MessageType::Question)
        .buttons(gtk::ButtonsType::OkCancel)
        .text(prompt)
        .build();
    let (tx, rx) = tokio::sync::oneshot::channel();
    let tx = Cell::new(Some(tx));
    dialog.connect_response(move |dlg, resp| {
        if let Some(tx) = tx.take() {
            let _ = tx.send(resp == gtk::ResponseType::Ok);
        }
        dlg.close();
    });
    dialog.present();
    rx.await.unwrap_or(false)
}

pub fn toast(overlay: &adw::ToastOverlay, message: &str) {
    overlay.add_toast(adw::Toast::new(message));
}
