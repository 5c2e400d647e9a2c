use gtk4 as gtk;
use gtk4::prelude::*;
use std::rc::Rc;

use crate::api::models::SenderType;
use crate::surfaces::{Avatar, Bubble};

/// Message pane plus input row, shared by all three windows.
pub struct ChatView {
    root: gtk::Box,
    scroller: gtk::ScrolledWindow,
    messages_box: gtk::Box,
    typing: gtk::Label,
    entry: gtk::Entry,
    send_btn: gtk::Button,
    /// Sender rendered on the right-hand side.
    outgoing: SenderType,
}

impl ChatView {
    pub fn new(outgoing: SenderType, placeholder: &str) -> Rc<Self> {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);

        let scroller = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .hexpand(true)
            .build();
        let messages_box = gtk::Box::new(gtk::Orientation::Vertical, 6);
        scroller.set_child(Some(&messages_box));
        root.append(&scroller);

        let typing = gtk::Label::new(Some("…"));
        typing.add_css_class("dim-label");
        typing.set_halign(gtk::Align::Start);
        typing.set_visible(false);
        root.append(&typing);

        // Input row
        let input_row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        let entry = gtk::Entry::new();
        entry.set_hexpand(true);
        entry.set_placeholder_text(Some(placeholder));
        let send_btn = gtk::Button::with_label("Send");
        send_btn.add_css_class("suggested-action");
        input_row.append(&entry);
        input_row.append(&send_btn);
        root.append(&input_row);

        Rc::new(Self { root, scroller, messages_box, typing, entry, send_btn, outgoing })
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    /// Calls `f` with the entry text on click or Enter.
    pub fn connect_send<F: Fn(String) + 'static>(&self, f: F) {
        let f = Rc::new(f);
        {
            let f = f.clone();
            let entry = self.entry.clone();
            self.send_btn.connect_clicked(move |_| f(entry.text().to_string()));
        }
        self.entry.connect_activate(move |entry| f(entry.text().to_string()));
    }

    pub fn clear(&self) {
        while let Some(child) = self.messages_box.first_child() {
            self.messages_box.remove(&child);
        }
    }

    pub fn append(&self, bubble: &Bubble) {
        self.messages_box.append(&bubble_widget(bubble, bubble.sender == self.outgoing));
        let adj = self.scroller.vadjustment();
        adj.set_value(adj.upper());
    }

    pub fn clear_input(&self) {
        self.entry.set_text("");
    }

    pub fn set_send_enabled(&self, enabled: bool) {
        self.send_btn.set_sensitive(enabled);
    }

    pub fn set_input_enabled(&self, enabled: bool) {
        self.entry.set_sensitive(enabled);
        self.send_btn.set_sensitive(enabled);
    }

    pub fn set_typing(&self, visible: bool) {
        self.typing.set_visible(visible);
    }
}

fn bubble_widget(bubble: &Bubble, outgoing: bool) -> gtk::Widget {
    let row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
    let avatar = match &bubble.avatar {
        Avatar::Text(text) => gtk::Label::new(Some(text)),
        Avatar::Image(src) => {
            let label = gtk::Label::new(Some("👤"));
            label.set_tooltip_text(Some(src));
            label
        }
    };
    avatar.set_valign(gtk::Align::Start);

    let column = gtk::Box::new(gtk::Orientation::Vertical, 2);
    if let Some(name) = &bubble.sender_name {
        let name_lbl = gtk::Label::new(Some(name));
        name_lbl.add_css_class("caption-heading");
        name_lbl.set_halign(gtk::Align::Start);
        column.append(&name_lbl);
    }
    let text = gtk::Label::new(Some(&bubble.text));
    text.set_wrap(true);
    text.set_xalign(0.0);
    text.set_selectable(true);
    text.add_css_class("card");
    column.append(&text);
    if let Some(time) = &bubble.time {
        let time_lbl = gtk::Label::new(Some(time));
        time_lbl.add_css_class("dim-label");
        time_lbl.add_css_class("caption");
        time_lbl.set_halign(gtk::Align::End);
        column.append(&time_lbl);
    }

    if outgoing {
        row.append(&column);
        row.append(&avatar);
        row.set_halign(gtk::Align::End);
    } else {
        row.append(&avatar);
        row.append(&column);
        row.set_halign(gtk::Align::Start);
    }
    if bubble.sender == SenderType::System {
        row.set_halign(gtk::Align::Center);
        text.add_css_class("dim-label");
    }
    row.upcast()
}
