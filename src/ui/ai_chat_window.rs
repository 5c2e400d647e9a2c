use adw::Application;
use adw::prelude::*;
use gtk4 as gtk;
use std::rc::Rc;

use crate::api::ApiClient;
use crate::api::models::SenderType;
use crate::app::AppConfig;
use crate::storage::LocalStore;
use crate::surfaces::Bubble;
use crate::surfaces::ai_chat::{AiChatPanel, AiChatView};
use crate::ui::Surface;
use crate::ui::chat_view::ChatView;

pub struct AiChatWidgets {
    app: Application,
    window: adw::ApplicationWindow,
    overlay: adw::ToastOverlay,
    store: Rc<LocalStore>,
    chat: Rc<ChatView>,
}

impl AiChatView for AiChatWidgets {
    fn append_bubble(&self, bubble: &Bubble) {
        self.chat.append(bubble);
    }

    fn set_typing(&self, visible: bool) {
        self.chat.set_typing(visible);
    }

    fn clear_input(&self) {
        self.chat.clear_input();
    }

    fn set_send_enabled(&self, enabled: bool) {
        self.chat.set_send_enabled(enabled);
    }

    fn alert(&self, message: &str) {
        crate::ui::toast(&self.overlay, message);
    }

    fn redirect_to_login(&self) {
        crate::ui::login::show_login_window(&self.app, AppConfig::load(), self.store.clone(), Surface::AiChat);
        self.window.close();
    }
}

pub fn show_ai_chat_window(app: &Application, config: &AppConfig, store: Rc<LocalStore>) {
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("AI Assistant")
        .default_width(520)
        .default_height(680)
        .build();

    let overlay = adw::ToastOverlay::new();
    let chat = ChatView::new(SenderType::Agent, "Ask the assistant…");
    overlay.set_child(Some(&chat.widget()));

    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let title = gtk::Label::new(Some("AI Assistant"));
    header.set_title_widget(Some(&title));
    container.append(&header);
    container.append(&overlay);
    window.set_content(Some(&container));

    let panel = Rc::new(AiChatPanel::new(
        ApiClient::new(&config.api_base),
        store.clone(),
        AiChatWidgets { app: app.clone(), window: window.clone(), overlay, store, chat: chat.clone() },
    ));

    let weak = Rc::downgrade(&panel);
    chat.connect_send(move |text| {
        if let Some(panel) = weak.upgrade() {
            crate::utils::spawn_local(async move { panel.send(&text).await });
        }
    });

    {
        let panel = std::cell::RefCell::new(Some(panel));
        window.connect_close_request(move |_| {
            panel.borrow_mut().take();
            gtk::glib::Propagation::Proceed
        });
    }

    window.present();
}
