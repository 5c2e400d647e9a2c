use adw::Application;
use adw::prelude::*;
use gtk4 as gtk;
use std::rc::Rc;

use crate::api::ApiClient;
use crate::app::AppConfig;
use crate::storage::LocalStore;
use crate::ui::Surface;

pub fn show_login_window(app: &Application, config: AppConfig, store: Rc<LocalStore>, next: Surface) {
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("SupportDesk Login")
        .default_width(420)
        .default_height(260)
        .resizable(false)
        .build();

    let toast_overlay = adw::ToastOverlay::new();

    // Root container
    let root = gtk::Box::new(gtk::Orientation::Vertical, 12);
    root.set_margin_top(24);
    root.set_margin_bottom(24);
    root.set_margin_start(24);
    root.set_margin_end(24);

    let title = gtk::Label::new(Some("Sign in to SupportDesk"));
    title.add_css_class("title-2");
    title.set_halign(gtk::Align::Start);
    root.append(&title);

    let server_entry = gtk::Entry::new();
    server_entry.set_placeholder_text(Some("Server URL (e.g. https://desk.example.com)"));
    server_entry.set_text(&config.api_base);
    server_entry.set_hexpand(true);

    let token_entry = gtk::PasswordEntry::new();
    token_entry.set_placeholder_text(Some("Access token"));
    token_entry.set_hexpand(true);

    let form = gtk::Box::new(gtk::Orientation::Vertical, 8);
    form.append(&server_entry);
    form.append(&token_entry);
    root.append(&form);

    let status = gtk::Label::new(None);
    status.add_css_class("dim-label");
    status.set_halign(gtk::Align::Start);
    root.append(&status);

    let login_btn = gtk::Button::with_label("Sign in");
    login_btn.add_css_class("suggested-action");
    login_btn.set_halign(gtk::Align::End);
    root.append(&login_btn);

    toast_overlay.set_child(Some(&root));
    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let header_title = gtk::Label::new(Some("SupportDesk"));
    header.set_title_widget(Some(&header_title));
    container.append(&header);
    container.append(&toast_overlay);
    window.set_content(Some(&container));

    let on_connect = {
        let app = app.clone();
        let window = window.clone();
        let overlay = toast_overlay.clone();
        let server_entry = server_entry.clone();
        let token_entry = token_entry.clone();
        let login_btn = login_btn.clone();
        move || {
            let url = crate::utils::normalize_url(&server_entry.text());
            let token = token_entry.text().trim().to_string();
            if url.is_empty() || token.is_empty() {
                crate::ui::toast(&overlay, "Please enter the server URL and an access token.");
                return;
            }

            status.set_label("Checking session…");
            login_btn.set_sensitive(false);

            let app = app.clone();
            let window = window.clone();
            let overlay = overlay.clone();
            let status = status.clone();
            let login_btn = login_btn.clone();
            let store = store.clone();
            let mut config = config.clone();
            crate::utils::spawn_local(async move {
                let result = ApiClient::new(&url).me(&token).await;
                login_btn.set_sensitive(true);
                match result {
                    Ok(me) => {
                        log::info!("[login] signed in as {}", me.display_name());
                        if let Err(e) = store.save_credentials(&token, me.id, &me.role) {
                            crate::ui::toast(&overlay, &format!("Failed to save session: {}", e));
                            return;
                        }
                        config.api_base = url;
                        if let Err(e) = config.save() {
                            log::warn!("[login] failed to save settings: {}", e);
                        }
                        match next {
                            Surface::AiChat => crate::ui::ai_chat_window::show_ai_chat_window(&app, &config, store),
                            _ => crate::ui::main_window::show_main_window(&app, &config, store),
                        }
                        window.close();
                    }
                    Err(err) => {
                        log::warn!("[login] session check failed: {}", err);
                        status.set_label("Sign-in failed");
                        crate::ui::toast(&overlay, "Could not validate the token. Check the URL and token.");
                    }
                }
            });
        }
    };

    let on_connect: Rc<dyn Fn()> = Rc::new(on_connect);
    {
        let on_connect = on_connect.clone();
        login_btn.connect_clicked(move |_| (on_connect)());
    }
    {
        let on_connect = on_connect.clone();
        server_entry.connect_activate(move |_| (on_connect)());
    }
    {
        let on_connect = on_connect.clone();
        token_entry.connect_activate(move |_| (on_connect)());
    }

    window.present();
}
