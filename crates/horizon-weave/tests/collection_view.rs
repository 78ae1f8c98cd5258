//! Integration tests for collection views.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::future::BoxFuture;
use horizon_weave::prelude::*;

#[derive(Attributes, Clone, Debug, PartialEq)]
struct Article {
    #[attributes(id)]
    id: u32,
    title: String,
    description: String,
}

fn article(id: u32, title: &str, description: &str) -> Record<Article> {
    Record::new(Article {
        id,
        title: title.into(),
        description: description.into(),
    })
}

fn two_articles() -> RecordSet<Article> {
    RecordSet::new(vec![article(1, "One", "Hello"), article(2, "Two", "World")])
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

struct ArticleView {
    record: Record<Article>,
}

impl ViewTemplate for ArticleView {
    fn html(&self) -> String {
        let article = self.record.attrs();
        format!("<div><h1>{}</h1><p>{}</p></div>", article.title, article.description)
    }
}

impl RecordTemplate for ArticleView {
    type Attrs = Article;

    fn from_record(record: Record<Article>) -> Self {
        Self { record }
    }

    fn record(&self) -> &Record<Article> {
        &self.record
    }
}

struct NoArticles;

impl ViewTemplate for NoArticles {
    fn html(&self) -> String {
        "<div>No articles</div>".into()
    }
}

#[derive(Default)]
struct Articles {
    added: AtomicUsize,
    tested: AtomicUsize,
    before_init: AtomicUsize,
    after_init: AtomicUsize,
}

impl Articles {
    fn on_add(view: &CollectionView<Self>, _event: &RecordSetEvent<Article>, _name: &str) {
        view.template().added.fetch_add(1, Ordering::SeqCst);
    }

    fn on_test(view: &CollectionView<Self>, _payload: &Payload, _name: &str) {
        view.template().tested.fetch_add(1, Ordering::SeqCst);
    }
}

impl CollectionTemplate for Articles {
    type Child = ArticleView;

    fn html(&self) -> String {
        "<div class=\"articles\"></div>".into()
    }

    fn record_set_events(&self) -> Vec<EventHandler<CollectionView<Self>, RecordSetEvent<Article>>> {
        vec![EventHandler::new(events::ADD, Articles::on_add)]
    }

    fn child_events(&self) -> Vec<EventHandler<CollectionView<Self>, Payload>> {
        vec![EventHandler::new("test", Articles::on_test)]
    }

    fn before_init<'a>(&'a self, _view: &'a CollectionView<Self>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.before_init.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn after_init<'a>(&'a self, _view: &'a CollectionView<Self>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.after_init.fetch_add(1, Ordering::SeqCst);
        })
    }
}

struct NestedArticles;

impl CollectionTemplate for NestedArticles {
    type Child = ArticleView;

    fn html(&self) -> String {
        "<div><p>Before</p><div class=\"actual-list\"></div><p>After</p></div>".into()
    }

    fn child_container(&self) -> Option<&str> {
        Some(".actual-list")
    }
}

fn surface() -> SharedSurface {
    Arc::new(Document::new())
}

fn collection(records: RecordSet<Article>) -> Arc<CollectionView<Articles>> {
    init_logging();
    CollectionView::new(Articles::default(), records, surface())
}

fn with_empty_view(view: &CollectionView<Articles>) {
    view.set_empty_view(|surface| View::new(NoArticles, surface.clone()).handle());
}

/// Tag name and text of the heading of every rendered child, in tree order.
fn headings(surface: &SharedSurface, container: NodeId) -> Vec<String> {
    surface
        .element_children(container)
        .unwrap()
        .into_iter()
        .map(|child| {
            let heading = surface.element_children(child).unwrap()[0];
            surface.text_content(heading).unwrap()
        })
        .collect()
}

#[tokio::test]
async fn test_renders_every_record_in_order() {
    let view = collection(two_articles());
    view.init().await.unwrap();

    let surface = view.surface();
    let root = view.el().unwrap();
    let children = surface.element_children(root).unwrap();
    assert_eq!(children.len(), 2);

    for (child, (title, description)) in children.iter().zip([("One", "Hello"), ("Two", "World")]) {
        let parts = surface.element_children(*child).unwrap();
        assert_eq!(surface.tag_name(parts[0]).unwrap().as_deref(), Some("h1"));
        assert_eq!(surface.text_content(parts[0]).unwrap(), title);
        assert_eq!(surface.tag_name(parts[1]).unwrap().as_deref(), Some("p"));
        assert_eq!(surface.text_content(parts[1]).unwrap(), description);
    }
    assert_eq!(view.child_views().len(), 2);
}

#[tokio::test]
async fn test_init_returns_the_rendered_markup() {
    let view = collection(two_articles());
    let html = view.init().await.unwrap();

    assert_eq!(
        html,
        "<div class=\"articles\"><div><h1>One</h1><p>Hello</p></div><div><h1>Two</h1><p>World</p></div></div>"
    );
}

#[tokio::test]
async fn test_shows_the_empty_view_without_records() {
    let view = collection(RecordSet::new(Vec::new()));
    with_empty_view(&view);
    view.init().await.unwrap();

    let surface = view.surface();
    let children = surface.element_children(view.el().unwrap()).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(surface.outer_html(children[0]).unwrap(), "<div>No articles</div>");
    assert!(view.empty_view().is_some());
}

#[tokio::test]
async fn test_adding_records_replaces_the_empty_view() {
    let view = collection(RecordSet::new(Vec::new()));
    with_empty_view(&view);
    view.init().await.unwrap();

    view.add_child_views(vec![article(1, "One", "Hello")], Position::End)
        .await
        .unwrap();

    let surface = view.surface();
    assert_eq!(headings(surface, view.el().unwrap()), vec!["One"]);
    assert!(view.empty_view().is_none());
}

#[tokio::test]
async fn test_renders_nothing_without_records_or_empty_view() {
    let view = collection(RecordSet::new(Vec::new()));
    view.init().await.unwrap();

    let surface = view.surface();
    assert!(surface.element_children(view.el().unwrap()).unwrap().is_empty());
    assert!(view.empty_view().is_none());
}

#[tokio::test]
async fn test_sorts_records_before_rendering() {
    let view = collection(two_articles());
    view.set_sort(|mut records| {
        records.reverse();
        records
    });
    view.init().await.unwrap();

    assert_eq!(headings(view.surface(), view.el().unwrap()), vec!["Two", "One"]);
}

#[tokio::test]
async fn test_filters_records_before_rendering() {
    let view = collection(two_articles());
    view.set_filter(|records| {
        records
            .into_iter()
            .filter(|record| record.attrs().title == "Two")
            .collect()
    });
    view.init().await.unwrap();

    assert_eq!(headings(view.surface(), view.el().unwrap()), vec!["Two"]);
}

#[tokio::test]
async fn test_filters_then_sorts() {
    let records = RecordSet::new(vec![
        article(1, "One", ""),
        article(2, "Two", ""),
        article(3, "Three", ""),
    ]);
    let view = collection(records);
    view.set_filter(|records| records.into_iter().take(2).collect());
    view.set_sort(|mut records| {
        records.reverse();
        records
    });
    view.init().await.unwrap();

    // Sorting first would have kept "Three".
    assert_eq!(headings(view.surface(), view.el().unwrap()), vec!["Two", "One"]);
}

#[tokio::test]
async fn test_record_set_handlers_run_once_per_event() {
    let records = two_articles();
    let view = collection(records.clone());
    view.init().await.unwrap();

    records.add(article(3, "Three", ""));
    assert_eq!(view.template().added.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_init_hooks_run_once() {
    let view = collection(two_articles());
    view.init().await.unwrap();
    view.init().await.unwrap();

    assert_eq!(view.template().before_init.load(Ordering::SeqCst), 1);
    assert_eq!(view.template().after_init.load(Ordering::SeqCst), 1);
    // Re-rendering does not stack children.
    assert_eq!(view.child_views().len(), 2);
}

#[tokio::test]
async fn test_child_events_reach_the_collection_view() {
    let view = collection(two_articles());
    view.init().await.unwrap();

    let children = view.child_views();
    children[0].trigger("test", &Payload::Null);
    children[1].trigger("test", &Payload::Null);
    children[1].trigger("unrelated", &Payload::Null);

    assert_eq!(view.template().tested.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_renders_into_a_nested_child_container() {
    init_logging();
    let surface = surface();
    let view = CollectionView::new(NestedArticles, two_articles(), surface.clone());
    view.init().await.unwrap();

    let root = view.el().unwrap();
    let parts = surface.element_children(root).unwrap();
    assert_eq!(parts.len(), 3);
    assert_eq!(surface.text_content(parts[0]).unwrap(), "Before");
    assert_eq!(surface.text_content(parts[2]).unwrap(), "After");
    assert_eq!(view.child_container().unwrap(), parts[1]);
    assert_eq!(headings(&surface, parts[1]), vec!["One", "Two"]);
}

#[tokio::test]
async fn test_inserts_a_batch_before_a_child() {
    let records = RecordSet::new(vec![article(1, "One", ""), article(4, "Four", "")]);
    let view = collection(records);
    view.init().await.unwrap();

    view.add_child_views(
        vec![article(2, "Two", ""), article(3, "Three", "")],
        Position::Before(RecordId::from(4u32)),
    )
    .await
    .unwrap();

    assert_eq!(
        headings(view.surface(), view.el().unwrap()),
        vec!["One", "Two", "Three", "Four"]
    );
    for child in view.child_views() {
        let el = child.el().unwrap();
        assert_eq!(view.surface().parent(el).unwrap(), view.el());
    }
}

#[tokio::test]
async fn test_inserts_a_batch_after_a_child_and_at_the_start() {
    let records = RecordSet::new(vec![article(2, "Two", ""), article(5, "Five", "")]);
    let view = collection(records);
    view.init().await.unwrap();

    view.add_child_views(
        vec![article(3, "Three", ""), article(4, "Four", "")],
        Position::After(RecordId::from(2u32)),
    )
    .await
    .unwrap();
    view.add_child_view(article(1, "One", ""), Position::Start)
        .await
        .unwrap();

    assert_eq!(
        headings(view.surface(), view.el().unwrap()),
        vec!["One", "Two", "Three", "Four", "Five"]
    );
}

#[tokio::test]
async fn test_unknown_target_leaves_the_tree_untouched() {
    let view = collection(two_articles());
    view.init().await.unwrap();

    let err = view
        .add_child_views(vec![article(3, "Three", "")], Position::After(RecordId::from(9u32)))
        .await
        .unwrap_err();

    assert_eq!(err, WeaveError::TargetNotFound { id: RecordId::from(9u32) });
    assert_eq!(headings(view.surface(), view.el().unwrap()), vec!["One", "Two"]);
    assert_eq!(view.child_views().len(), 2);
}

#[tokio::test]
async fn test_removes_single_and_all_children() {
    let view = collection(RecordSet::new(vec![
        article(1, "One", ""),
        article(2, "Two", ""),
        article(3, "Three", ""),
    ]));
    view.init().await.unwrap();

    assert!(view.remove_child_view(&RecordId::from(2u32)).unwrap());
    assert!(!view.remove_child_view(&RecordId::from(2u32)).unwrap());
    assert_eq!(headings(view.surface(), view.el().unwrap()), vec!["One", "Three"]);

    view.remove_all_child_views().unwrap();
    assert!(view.child_views().is_empty());
    assert!(view.surface().element_children(view.el().unwrap()).unwrap().is_empty());
}

#[tokio::test]
async fn test_removal_stops_listening_to_the_record_set() {
    let records = two_articles();
    let view = collection(records.clone());
    view.init().await.unwrap();
    assert_eq!(records.events().listener_count(events::ADD), 1);

    let children = view.child_views();
    view.remove().unwrap();

    assert!(view.el().is_none());
    assert_eq!(records.events().listener_count(events::ADD), 0);
    records.add(article(3, "Three", ""));
    assert_eq!(view.template().added.load(Ordering::SeqCst), 0);

    children[0].trigger("test", &Payload::Null);
    assert_eq!(view.template().tested.load(Ordering::SeqCst), 0);
}
