use gtk4 as gtk;
use gtk4::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

use crate::surfaces::dashboard::ListEntry;

type IdCallback = Rc<dyn Fn(i64)>;

/// Conversation list with channel tabs.
pub struct Sidebar {
    root: gtk::Box,
    tabs: gtk::Box,
    list: gtk::ListBox,
    ids: RefCell<Vec<Option<i64>>>,
    on_delete: RefCell<Option<IdCallback>>,
}

pub const CHANNELS: [(&str, &str); 5] = [
    ("all", "All"),
    ("kakao", "Kakao"),
    ("instagram", "Instagram"),
    ("facebook", "Facebook"),
    ("widget", "Widget"),
];

impl Sidebar {
    pub fn new() -> Rc<Self> {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);
        root.set_width_request(280);

        let title = gtk::Label::new(Some("Conversations"));
        title.add_css_class("heading");
        title.set_halign(gtk::Align::Start);
        root.append(&title);

        let tabs = gtk::Box::new(gtk::Orientation::Horizontal, 4);
        tabs.add_css_class("linked");
        root.append(&tabs);

        let list = gtk::ListBox::new();
        list.add_css_class("navigation-sidebar");
        let scroller = gtk::ScrolledWindow::builder().vexpand(true).child(&list).build();
        root.append(&scroller);

        Rc::new(Self {
            root,
            tabs,
            list,
            ids: RefCell::new(Vec::new()),
            on_delete: RefCell::new(None),
        })
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    /// Builds one toggle per channel; `f` receives the channel key.
    pub fn connect_channel<F: Fn(&str) + 'static>(&self, f: F) {
        let f = Rc::new(f);
        let mut group: Option<gtk::ToggleButton> = None;
        for (key, label) in CHANNELS {
            let btn = gtk::ToggleButton::with_label(label);
            if let Some(first) = &group {
                btn.set_group(Some(first));
            } else {
                btn.set_active(true);
                group = Some(btn.clone());
            }
            let f = f.clone();
            btn.connect_toggled(move |b| {
                if b.is_active() {
                    f(key);
                }
            });
            self.tabs.append(&btn);
        }
    }

    pub fn connect_select<F: Fn(i64) + 'static>(self: &Rc<Self>, f: F) {
        let this = Rc::downgrade(self);
        self.list.connect_row_activated(move |_, row| {
            let Some(this) = this.upgrade() else { return };
            let id = this.ids.borrow().get(row.index() as usize).copied().flatten();
            if let Some(id) = id {
                f(id);
            }
        });
    }

    pub fn connect_delete<F: Fn(i64) + 'static>(&self, f: F) {
        *self.on_delete.borrow_mut() = Some(Rc::new(f));
    }

    pub fn set_entries(&self, entries: &[ListEntry]) {
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            let row = gtk::ListBoxRow::new();
            match entry {
                ListEntry::Placeholder(text) => {
                    let label = gtk::Label::new(Some(text));
                    label.add_css_class("dim-label");
                    label.set_margin_top(12);
                    label.set_margin_bottom(12);
                    row.set_child(Some(&label));
                    row.set_activatable(false);
                    ids.push(None);
                }
                ListEntry::Row(conv) => {
                    let content = gtk::Box::new(gtk::Orientation::Horizontal, 6);
                    let text = gtk::Box::new(gtk::Orientation::Vertical, 2);
                    text.set_hexpand(true);
                    let title = gtk::Label::new(Some(&conv.title));
                    title.set_halign(gtk::Align::Start);
                    let sub = gtk::Label::new(Some(&conv.subtitle));
                    sub.add_css_class("dim-label");
                    sub.set_halign(gtk::Align::Start);
                    sub.set_ellipsize(gtk::pango::EllipsizeMode::End);
                    text.append(&title);
                    text.append(&sub);
                    content.append(&text);

                    let delete_btn = gtk::Button::with_label("×");
                    delete_btn.set_tooltip_text(Some("Delete conversation"));
                    delete_btn.add_css_class("flat");
                    let on_delete = self.on_delete.borrow().clone();
                    let id = conv.id;
                    delete_btn.connect_clicked(move |_| {
                        if let Some(cb) = &on_delete {
                            cb(id);
                        }
                    });
                    content.append(&delete_btn);

                    content.set_margin_top(6);
                    content.set_margin_bottom(6);
                    row.set_child(Some(&content));
                    ids.push(Some(conv.id));
                }
            }
            self.list.append(&row);
            if let ListEntry::Row(conv) = entry {
                if conv.active {
                    self.list.select_row(Some(&row));
                }
            }
        }
        *self.ids.borrow_mut() = ids;
    }

    pub fn mark_active(&self, id: Option<i64>) {
        let index = id.and_then(|id| self.ids.borrow().iter().position(|v| *v == Some(id)));
        match index.and_then(|i| self.list.row_at_index(i as i32)) {
            Some(row) => self.list.select_row(Some(&row)),
            None => self.list.unselect_all(),
        }
    }
}
