use adw::Application;
use adw::prelude::*;
use gtk4 as gtk;
use gtk4::gio;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::api::ApiClient;
use crate::api::models::{Agent, SenderType};
use crate::app::AppConfig;
use crate::notify::Notification;
use crate::storage::LocalStore;
use crate::surfaces::dashboard::{CustomerCard, Dashboard, DashboardSettings, DashboardView, ListEntry};
use crate::surfaces::Bubble;
use crate::ui::chat_view::ChatView;
use crate::ui::sidebar::Sidebar;
use crate::ui::Surface;
use crate::utils;

type Dash = Dashboard<DashboardWidgets>;

/// Right-hand customer panel.
struct CustomerPanel {
    root: gtk::Box,
    name: gtk::Label,
    details: gtk::Label,
    tags: gtk::Box,
    memo: gtk::Entry,
    save_btn: gtk::Button,
}

impl CustomerPanel {
    fn new() -> Self {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 8);
        root.set_width_request(240);
        root.set_margin_top(12);
        root.set_margin_bottom(12);
        root.set_margin_start(12);
        root.set_margin_end(12);

        let heading = gtk::Label::new(Some("Customer"));
        heading.add_css_class("heading");
        heading.set_halign(gtk::Align::Start);
        root.append(&heading);

        let name = gtk::Label::new(None);
        name.add_css_class("title-4");
        name.set_halign(gtk::Align::Start);
        root.append(&name);

        let details = gtk::Label::new(None);
        details.set_halign(gtk::Align::Start);
        details.set_xalign(0.0);
        details.set_selectable(true);
        root.append(&details);

        let tags = gtk::Box::new(gtk::Orientation::Horizontal, 4);
        root.append(&tags);

        let memo = gtk::Entry::new();
        memo.set_placeholder_text(Some("Memo"));
        root.append(&memo);
        let save_btn = gtk::Button::with_label("Save memo");
        save_btn.set_halign(gtk::Align::End);
        root.append(&save_btn);

        root.set_visible(false);
        Self { root, name, details, tags, memo, save_btn }
    }

    fn show(&self, card: &CustomerCard) {
        self.name.set_label(&card.name);
        self.details.set_label(&format!(
            "Platform: {}\nID: {}\nPhone: {}\nGender: {}\nAge: {}",
            card.platform, card.external_id, card.phone, card.gender, card.age
        ));
        while let Some(child) = self.tags.first_child() {
            self.tags.remove(&child);
        }
        for tag in &card.tags {
            let chip = gtk::Label::new(Some(tag));
            chip.add_css_class("caption");
            chip.add_css_class("card");
            self.tags.append(&chip);
        }
        self.tags.set_visible(!card.tags.is_empty());
        self.memo.set_text(&card.memo);
        self.root.set_visible(true);
    }

    fn hide(&self) {
        self.root.set_visible(false);
    }
}

/// Notification history shown in a side revealer.
struct NotificationPanel {
    button: gtk::Button,
    revealer: gtk::Revealer,
    list: gtk::ListBox,
    clear_btn: gtk::Button,
    ids: RefCell<Vec<i64>>,
}

impl NotificationPanel {
    fn new() -> Self {
        let button = gtk::Button::with_label("🔔");
        button.set_tooltip_text(Some("Notifications"));

        let column = gtk::Box::new(gtk::Orientation::Vertical, 6);
        column.set_width_request(280);
        column.set_margin_top(8);
        column.set_margin_bottom(8);
        column.set_margin_start(8);
        column.set_margin_end(8);
        let heading = gtk::Label::new(Some("Notifications"));
        heading.add_css_class("heading");
        heading.set_halign(gtk::Align::Start);
        column.append(&heading);

        let list = gtk::ListBox::new();
        list.add_css_class("boxed-list");
        let scroller = gtk::ScrolledWindow::builder().vexpand(true).child(&list).build();
        column.append(&scroller);

        let clear_btn = gtk::Button::with_label("Clear all");
        clear_btn.add_css_class("destructive-action");
        column.append(&clear_btn);

        let revealer = gtk::Revealer::builder()
            .transition_type(gtk::RevealerTransitionType::SlideLeft)
            .reveal_child(false)
            .child(&column)
            .build();

        Self { button, revealer, list, clear_btn, ids: RefCell::new(Vec::new()) }
    }

    fn render(&self, items: &[Notification], unread: usize) {
        self.button.set_label(&if unread > 0 { format!("🔔 {}", unread) } else { "🔔".to_string() });
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
        let mut ids = Vec::with_capacity(items.len());
        if items.is_empty() {
            let row = gtk::ListBoxRow::new();
            let label = gtk::Label::new(Some("No notifications."));
            label.add_css_class("dim-label");
            label.set_margin_top(12);
            label.set_margin_bottom(12);
            row.set_child(Some(&label));
            row.set_activatable(false);
            self.list.append(&row);
        }
        for n in items {
            let row = gtk::ListBoxRow::new();
            let column = gtk::Box::new(gtk::Orientation::Vertical, 2);
            column.set_margin_top(6);
            column.set_margin_bottom(6);
            column.set_margin_start(6);
            column.set_margin_end(6);
            let title = gtk::Label::new(Some(&n.title));
            title.set_halign(gtk::Align::Start);
            if !n.read {
                title.add_css_class("heading");
            }
            let body = gtk::Label::new(Some(&n.body));
            body.set_halign(gtk::Align::Start);
            body.set_wrap(true);
            body.set_xalign(0.0);
            let time = gtk::Label::new(Some(
                &n.timestamp.with_timezone(&chrono::Local).format("%H:%M").to_string(),
            ));
            time.add_css_class("dim-label");
            time.add_css_class("caption");
            time.set_halign(gtk::Align::End);
            column.append(&title);
            column.append(&body);
            column.append(&time);
            row.set_child(Some(&column));
            self.list.append(&row);
            ids.push(n.id);
        }
        *self.ids.borrow_mut() = ids;
    }
}

pub struct DashboardWidgets {
    app: Application,
    window: adw::ApplicationWindow,
    overlay: adw::ToastOverlay,
    store: Rc<LocalStore>,
    agent_label: gtk::Label,
    users: gtk::Expander,
    users_list: gtk::Box,
    sidebar: Rc<Sidebar>,
    chat: Rc<ChatView>,
    customer: CustomerPanel,
    notifications: NotificationPanel,
}

impl DashboardView for DashboardWidgets {
    fn show_agent(&self, name: &str, role_label: &str) {
        self.agent_label.set_label(&format!("{} ({})", name, role_label));
    }

    fn show_users(&self, users: &[Agent]) {
        while let Some(child) = self.users_list.first_child() {
            self.users_list.remove(&child);
        }
        for user in users {
            let state = if user.is_active { "active" } else { "inactive" };
            let label = gtk::Label::new(Some(&format!(
                "{} · {} · {}",
                user.display_name(),
                user.role,
                state
            )));
            label.set_halign(gtk::Align::Start);
            label.set_tooltip_text(Some(&user.email));
            self.users_list.append(&label);
        }
        self.users.set_label(Some(&format!("Team ({})", users.len())));
        self.users.set_visible(true);
    }

    fn show_conversations(&self, entries: &[ListEntry]) {
        self.sidebar.set_entries(entries);
    }

    fn mark_active(&self, conversation_id: Option<i64>) {
        self.sidebar.mark_active(conversation_id);
    }

    fn clear_messages(&self) {
        self.chat.clear();
    }

    fn append_message(&self, bubble: &Bubble) {
        self.chat.append(bubble);
    }

    fn clear_draft(&self) {
        self.chat.clear_input();
    }

    fn set_send_enabled(&self, enabled: bool) {
        self.chat.set_send_enabled(enabled);
    }

    fn show_customer(&self, card: &CustomerCard) {
        self.customer.show(card);
    }

    fn hide_customer(&self) {
        self.customer.hide();
    }

    fn show_notifications(&self, items: &[Notification], unread: usize) {
        self.notifications.render(items, unread);
    }

    fn set_notification_panel(&self, open: bool) {
        self.notifications.revealer.set_reveal_child(open);
    }

    fn desktop_notify(&self, notification: &Notification) {
        let n = gio::Notification::new(&notification.title);
        n.set_body(Some(&notification.body));
        if notification.conversation_id.is_some() {
            n.set_default_action_and_target_value(
                "app.open-conversation",
                Some(&notification.id.to_variant()),
            );
        }
        let id = notification.conversation_id.map(|c| format!("conversation-{}", c));
        self.app.send_notification(id.as_deref(), &n);
    }

    fn alert(&self, message: &str) {
        crate::ui::toast(&self.overlay, message);
    }

    async fn confirm(&self, prompt: &str) -> bool {
        crate::ui::confirm(&self.window, prompt).await
    }

    fn redirect_to_login(&self) {
        log::info!("[dashboard] returning to login");
        crate::ui::login::show_login_window(&self.app, AppConfig::load(), self.store.clone(), Surface::Dashboard);
        self.window.close();
    }
}

/// Runs `f` against the dashboard on the main context if it is still alive.
fn with_dash<F, Fut>(weak: &Weak<Dash>, f: F)
where
    F: FnOnce(Rc<Dash>) -> Fut,
    Fut: std::future::Future<Output = ()> + 'static,
{
    if let Some(dash) = weak.upgrade() {
        utils::spawn_local(f(dash));
    }
}

pub fn show_main_window(app: &Application, config: &AppConfig, store: Rc<LocalStore>) {
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("SupportDesk")
        .default_width(1200)
        .default_height(760)
        .build();

    let overlay = adw::ToastOverlay::new();

    let sidebar = Sidebar::new();
    let chat = ChatView::new(SenderType::Agent, "Type a reply…");
    let customer = CustomerPanel::new();
    let notifications = NotificationPanel::new();

    // Chat column: consultation controls above the message pane
    let center = gtk::Box::new(gtk::Orientation::Vertical, 0);
    center.set_hexpand(true);
    let actions = gtk::Box::new(gtk::Orientation::Horizontal, 6);
    actions.set_margin_top(8);
    actions.set_margin_start(8);
    actions.set_margin_end(8);
    let connect_btn = gtk::Button::with_label("Connect");
    let end_btn = gtk::Button::with_label("End consultation");
    end_btn.add_css_class("destructive-action");
    actions.append(&connect_btn);
    actions.append(&end_btn);
    center.append(&actions);
    center.append(&chat.widget());

    let users_list = gtk::Box::new(gtk::Orientation::Vertical, 4);
    let users = gtk::Expander::new(Some("Team"));
    users.set_child(Some(&users_list));
    users.set_margin_start(8);
    users.set_margin_end(8);
    users.set_visible(false);

    let left = gtk::Box::new(gtk::Orientation::Vertical, 0);
    left.append(&sidebar.widget());
    left.append(&users);

    let body = gtk::Box::new(gtk::Orientation::Horizontal, 0);
    body.append(&left);
    body.append(&gtk::Separator::new(gtk::Orientation::Vertical));
    body.append(&center);
    body.append(&customer.root);
    body.append(&notifications.revealer);
    overlay.set_child(Some(&body));

    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let title = gtk::Label::new(Some("SupportDesk"));
    header.set_title_widget(Some(&title));
    let agent_label = gtk::Label::new(None);
    agent_label.add_css_class("dim-label");
    header.pack_start(&agent_label);
    let logout_btn = gtk::Button::with_label("Sign out");
    header.pack_end(&logout_btn);
    header.pack_end(&notifications.button);
    container.append(&header);
    container.append(&overlay);
    window.set_content(Some(&container));

    let widgets = DashboardWidgets {
        app: app.clone(),
        window: window.clone(),
        overlay,
        store: store.clone(),
        agent_label,
        users,
        users_list,
        sidebar: sidebar.clone(),
        chat: chat.clone(),
        customer,
        notifications,
    };
    let dash: Rc<Dash> = Rc::new(Dashboard::new(
        ApiClient::new(&config.api_base),
        store,
        widgets,
        DashboardSettings::from(config),
    ));
    let weak = Rc::downgrade(&dash);

    {
        let weak = weak.clone();
        sidebar.connect_channel(move |key| {
            let key = key.to_string();
            with_dash(&weak, |d| async move { d.switch_channel(&key).await });
        });
    }
    {
        let weak = weak.clone();
        sidebar.connect_select(move |id| {
            with_dash(&weak, |d| async move { d.select_conversation(id).await });
        });
    }
    {
        let weak = weak.clone();
        sidebar.connect_delete(move |id| {
            with_dash(&weak, |d| async move { d.delete_conversation(id).await });
        });
    }
    {
        let weak = weak.clone();
        chat.connect_send(move |text| {
            with_dash(&weak, |d| async move { d.send_message(&text).await });
        });
    }
    {
        let weak = weak.clone();
        connect_btn.connect_clicked(move |_| {
            with_dash(&weak, |d| async move { d.connect_conversation().await });
        });
    }
    {
        let weak = weak.clone();
        end_btn.connect_clicked(move |_| {
            with_dash(&weak, |d| async move { d.end_conversation().await });
        });
    }
    {
        let weak = weak.clone();
        logout_btn.connect_clicked(move |_| {
            if let Some(d) = weak.upgrade() {
                d.logout();
            }
        });
    }
    {
        let weak = weak.clone();
        let memo = dash.view().customer.memo.clone();
        dash.view().customer.save_btn.connect_clicked(move |_| {
            let text = memo.text().to_string();
            with_dash(&weak, |d| async move { d.save_memo(&text).await });
        });
    }
    {
        let weak = weak.clone();
        dash.view().notifications.button.connect_clicked(move |_| {
            if let Some(d) = weak.upgrade() {
                d.toggle_notification_panel();
            }
        });
    }
    {
        let weak = weak.clone();
        dash.view().notifications.list.connect_row_activated(move |_, row| {
            let Some(d) = weak.upgrade() else { return };
            let id = d.view().notifications.ids.borrow().get(row.index() as usize).copied();
            if let Some(id) = id {
                utils::spawn_local(async move { d.activate_notification(id).await });
            }
        });
    }
    {
        let weak = weak.clone();
        dash.view().notifications.clear_btn.connect_clicked(move |_| {
            with_dash(&weak, |d| async move { d.clear_notifications().await });
        });
    }

    // Clicking a desktop notification opens its conversation.
    {
        let weak = weak.clone();
        let window = window.clone();
        let action = gio::SimpleAction::new("open-conversation", Some(gtk::glib::VariantTy::INT64));
        action.connect_activate(move |_, param| {
            let Some(id) = param.and_then(|p| p.get::<i64>()) else { return };
            window.present();
            with_dash(&weak, |d| async move { d.activate_notification(id).await });
        });
        app.add_action(&action);
    }

    // Push events are applied on the main context in arrival order.
    if let Some(mut events) = dash.take_events() {
        let weak = weak.clone();
        utils::spawn_local(async move {
            while let Some(event) = events.recv().await {
                let Some(d) = weak.upgrade() else { break };
                if d.is_signed_out() {
                    break;
                }
                d.handle_event(event).await;
            }
            log::debug!("[dashboard] event stream closed");
        });
    }

    // Controllers are released with the window.
    {
        let dash = RefCell::new(Some(dash.clone()));
        window.connect_close_request(move |_| {
            dash.borrow_mut().take();
            gtk::glib::Propagation::Proceed
        });
    }

    window.present();
    dash.view().notifications.render(&[], 0);
    utils::spawn_local(async move {
        dash.init().await;
    });
}
