use adw::Application;
use adw::prelude::*;
use gtk4 as gtk;
use std::cell::RefCell;
use std::rc::Rc;

use crate::api::ApiClient;
use crate::api::models::SenderType;
use crate::app::AppConfig;
use crate::storage::LocalStore;
use crate::surfaces::Bubble;
use crate::surfaces::widget::{Widget, WidgetSettings, WidgetView};
use crate::ui::chat_view::ChatView;
use crate::utils;

pub struct WidgetWidgets {
    overlay: adw::ToastOverlay,
    revealer: gtk::Revealer,
    chat_btn: gtk::Button,
    chat: Rc<ChatView>,
}

impl WidgetView for WidgetWidgets {
    fn set_window_open(&self, open: bool) {
        self.revealer.set_reveal_child(open);
        self.chat_btn.set_visible(!open);
    }

    fn append_bubble(&self, bubble: &Bubble) {
        self.chat.append(bubble);
    }

    fn clear_input(&self) {
        self.chat.clear_input();
    }

    fn set_input_enabled(&self, enabled: bool) {
        self.chat.set_input_enabled(enabled);
    }

    fn set_send_enabled(&self, enabled: bool) {
        self.chat.set_send_enabled(enabled);
    }

    fn alert(&self, message: &str) {
        crate::ui::toast(&self.overlay, message);
    }
}

pub fn show_widget_window(app: &Application, config: &AppConfig, store: Rc<LocalStore>) {
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("Chat with us")
        .default_width(380)
        .default_height(600)
        .build();

    let overlay = adw::ToastOverlay::new();
    let chat = ChatView::new(SenderType::Customer, "Type a message…");

    // Chat window header: title, AI info and close
    let chat_header = gtk::Box::new(gtk::Orientation::Horizontal, 6);
    chat_header.set_margin_top(6);
    chat_header.set_margin_start(8);
    chat_header.set_margin_end(8);
    let chat_title = gtk::Label::new(Some("Customer support"));
    chat_title.add_css_class("heading");
    chat_title.set_hexpand(true);
    chat_title.set_halign(gtk::Align::Start);
    let info_btn = gtk::Button::with_label("🤖");
    info_btn.set_tooltip_text(Some("About AI replies"));
    info_btn.add_css_class("flat");
    let close_btn = gtk::Button::with_label("×");
    close_btn.add_css_class("flat");
    chat_header.append(&chat_title);
    chat_header.append(&info_btn);
    chat_header.append(&close_btn);

    let chat_box = gtk::Box::new(gtk::Orientation::Vertical, 0);
    chat_box.append(&chat_header);
    chat_box.append(&chat.widget());

    let revealer = gtk::Revealer::builder()
        .transition_type(gtk::RevealerTransitionType::SlideUp)
        .reveal_child(false)
        .vexpand(true)
        .child(&chat_box)
        .build();

    let chat_btn = gtk::Button::with_label("💬 Chat");
    chat_btn.add_css_class("suggested-action");
    chat_btn.add_css_class("pill");
    chat_btn.set_halign(gtk::Align::End);
    chat_btn.set_valign(gtk::Align::End);
    chat_btn.set_margin_bottom(16);
    chat_btn.set_margin_end(16);

    let body = gtk::Box::new(gtk::Orientation::Vertical, 0);
    body.append(&revealer);
    body.append(&chat_btn);
    overlay.set_child(Some(&body));

    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    container.append(&header);
    container.append(&overlay);
    window.set_content(Some(&container));

    let widget = Rc::new(Widget::new(
        ApiClient::new(&config.api_base),
        &store,
        WidgetWidgets { overlay, revealer, chat_btn: chat_btn.clone(), chat: chat.clone() },
        WidgetSettings::from(config),
    ));
    log::info!("[widget] visitor {}", widget.visitor_id());
    let weak = Rc::downgrade(&widget);

    {
        let weak = weak.clone();
        chat_btn.connect_clicked(move |_| {
            if let Some(w) = weak.upgrade() {
                utils::spawn_local(async move { w.open().await });
            }
        });
    }
    {
        let weak = weak.clone();
        close_btn.connect_clicked(move |_| {
            if let Some(w) = weak.upgrade() {
                w.close();
            }
        });
    }
    {
        let weak = weak.clone();
        info_btn.connect_clicked(move |_| {
            if let Some(w) = weak.upgrade() {
                w.show_ai_info();
            }
        });
    }
    {
        let weak = weak.clone();
        chat.connect_send(move |text| {
            if let Some(w) = weak.upgrade() {
                utils::spawn_local(async move { w.send(&text).await });
            }
        });
    }

    widget.start_push();
    if let Some(mut events) = widget.take_events() {
        utils::spawn_local(async move {
            while let Some(event) = events.recv().await {
                let Some(w) = weak.upgrade() else { break };
                w.handle_event(event);
            }
            log::debug!("[widget] event stream closed");
        });
    }

    {
        let widget = RefCell::new(Some(widget));
        window.connect_close_request(move |_| {
            widget.borrow_mut().take();
            gtk::glib::Propagation::Proceed
        });
    }

    window.present();
}
