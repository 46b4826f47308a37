//! Pass-through decoration of property stores.
//!
//! A [`StoreDecorator`] names an inner store and inherits a forwarding
//! implementation of every [`PropertyStore`] operation. Implementors override
//! only the operations they intercept; everything else behaves exactly like
//! calling the inner store, errors and side effects included. Notifications
//! are forwarded once and never re-broadcast by the decorator.
//!
//! Every `StoreDecorator` is a `PropertyStore` through a blanket
//! implementation, so decorators stack.

use std::sync::Arc;

use lexo_meta::MetadataCatalog;
use lexo_types::{ClassId, FieldKind, FieldTag, ObjectId, PropValue, WsId};

use crate::error::StoreResult;
use crate::notify::{ChangeListener, SubscriptionId};
use crate::traits::PropertyStore;
use crate::types::{LoadScope, ObjectRecord, Ownership, PropChange};

/// A property store that wraps another one.
pub trait StoreDecorator: Send + Sync {
    /// The wrapped store.
    fn inner(&self) -> &dyn PropertyStore;

    fn class_of(&self, id: ObjectId) -> StoreResult<Option<ClassId>> {
        self.inner().class_of(id)
    }

    fn ids_of_class(&self, class: ClassId) -> StoreResult<Vec<ObjectId>> {
        self.inner().ids_of_class(class)
    }

    fn instance_count(&self, class: ClassId) -> StoreResult<usize> {
        self.inner().instance_count(class)
    }

    fn fetch_records(&self, class: ClassId, scope: LoadScope<'_>) -> StoreResult<Vec<ObjectRecord>> {
        self.inner().fetch_records(class, scope)
    }

    fn exists(&self, id: ObjectId) -> StoreResult<bool> {
        self.inner().exists(id)
    }

    fn owner_of(&self, id: ObjectId) -> StoreResult<Option<Ownership>> {
        self.inner().owner_of(id)
    }

    fn value(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Option<PropValue>> {
        self.inner().value(id, tag)
    }

    fn set_value(&self, id: ObjectId, tag: FieldTag, value: PropValue) -> StoreResult<()> {
        self.inner().set_value(id, tag, value)
    }

    fn multi_string(&self, id: ObjectId, tag: FieldTag, ws: WsId) -> StoreResult<Option<String>> {
        self.inner().multi_string(id, tag, ws)
    }

    fn set_multi_string(&self, id: ObjectId, tag: FieldTag, ws: WsId, text: &str) -> StoreResult<()> {
        self.inner().set_multi_string(id, tag, ws, text)
    }

    fn is_cached(&self, id: ObjectId, tag: FieldTag) -> StoreResult<bool> {
        self.inner().is_cached(id, tag)
    }

    fn evict(&self, id: ObjectId, tag: FieldTag) -> StoreResult<()> {
        self.inner().evict(id, tag)
    }

    fn int(&self, id: ObjectId, tag: FieldTag) -> StoreResult<i64> {
        self.inner().int(id, tag)
    }

    fn set_int(&self, id: ObjectId, tag: FieldTag, v: i64) -> StoreResult<()> {
        self.inner().set_int(id, tag, v)
    }

    fn boolean(&self, id: ObjectId, tag: FieldTag) -> StoreResult<bool> {
        self.inner().boolean(id, tag)
    }

    fn set_boolean(&self, id: ObjectId, tag: FieldTag, v: bool) -> StoreResult<()> {
        self.inner().set_boolean(id, tag, v)
    }

    fn string(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Option<String>> {
        self.inner().string(id, tag)
    }

    fn set_string(&self, id: ObjectId, tag: FieldTag, text: &str) -> StoreResult<()> {
        self.inner().set_string(id, tag, text)
    }

    fn object(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Option<ObjectId>> {
        self.inner().object(id, tag)
    }

    fn vector(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Vec<ObjectId>> {
        self.inner().vector(id, tag)
    }

    fn replace_range(
        &self,
        id: ObjectId,
        tag: FieldTag,
        start: usize,
        end: usize,
        items: &[ObjectId],
    ) -> StoreResult<()> {
        self.inner().replace_range(id, tag, start, end, items)
    }

    fn vector_size(&self, id: ObjectId, tag: FieldTag) -> StoreResult<usize> {
        self.inner().vector_size(id, tag)
    }

    fn vector_item(&self, id: ObjectId, tag: FieldTag, index: usize) -> StoreResult<ObjectId> {
        self.inner().vector_item(id, tag, index)
    }

    fn vector_index_of(&self, id: ObjectId, tag: FieldTag, item: ObjectId) -> StoreResult<Option<usize>> {
        self.inner().vector_index_of(id, tag, item)
    }

    fn create_object(&self, class: ClassId) -> StoreResult<ObjectId> {
        self.inner().create_object(class)
    }

    fn create_owned(
        &self,
        class: ClassId,
        owner: ObjectId,
        field: FieldTag,
        index: Option<usize>,
    ) -> StoreResult<ObjectId> {
        self.inner().create_owned(class, owner, field, index)
    }

    fn delete_object(&self, id: ObjectId) -> StoreResult<()> {
        self.inner().delete_object(id)
    }

    fn delete_with_owner_cleanup(&self, id: ObjectId) -> StoreResult<()> {
        self.inner().delete_with_owner_cleanup(id)
    }

    fn change_owner(
        &self,
        id: ObjectId,
        new_owner: ObjectId,
        field: FieldTag,
        index: Option<usize>,
    ) -> StoreResult<()> {
        self.inner().change_owner(id, new_owner, field, index)
    }

    fn insert_new_after(&self, after: ObjectId) -> StoreResult<ObjectId> {
        self.inner().insert_new_after(after)
    }

    fn subscribe(&self, listener: Arc<dyn ChangeListener>) -> SubscriptionId {
        self.inner().subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner().unsubscribe(id)
    }

    fn prop_changed(&self, change: &PropChange) {
        self.inner().prop_changed(change)
    }

    fn metadata(&self) -> Arc<dyn MetadataCatalog> {
        self.inner().metadata()
    }

    fn install_virtual(
        &self,
        class_name: &str,
        field_name: &str,
        kind: FieldKind,
        signature: Option<ClassId>,
    ) -> StoreResult<FieldTag> {
        self.inner()
            .install_virtual(class_name, field_name, kind, signature)
    }

    fn begin_task(&self, label: &str) -> StoreResult<()> {
        self.inner().begin_task(label)
    }

    fn end_task(&self) -> StoreResult<()> {
        self.inner().end_task()
    }

    fn continue_task(&self, label: &str) -> StoreResult<()> {
        self.inner().continue_task(label)
    }

    fn break_task(&self) -> StoreResult<()> {
        self.inner().break_task()
    }

    fn task_depth(&self) -> usize {
        self.inner().task_depth()
    }

    fn is_disposed(&self) -> bool {
        self.inner().is_disposed()
    }

    fn dispose(&self) {
        self.inner().dispose()
    }
}

impl<D: StoreDecorator> PropertyStore for D {
    fn class_of(&self, id: ObjectId) -> StoreResult<Option<ClassId>> {
        StoreDecorator::class_of(self, id)
    }

    fn ids_of_class(&self, class: ClassId) -> StoreResult<Vec<ObjectId>> {
        StoreDecorator::ids_of_class(self, class)
    }

    fn instance_count(&self, class: ClassId) -> StoreResult<usize> {
        StoreDecorator::instance_count(self, class)
    }

    fn fetch_records(&self, class: ClassId, scope: LoadScope<'_>) -> StoreResult<Vec<ObjectRecord>> {
        StoreDecorator::fetch_records(self, class, scope)
    }

    fn exists(&self, id: ObjectId) -> StoreResult<bool> {
        StoreDecorator::exists(self, id)
    }

    fn owner_of(&self, id: ObjectId) -> StoreResult<Option<Ownership>> {
        StoreDecorator::owner_of(self, id)
    }

    fn value(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Option<PropValue>> {
        StoreDecorator::value(self, id, tag)
    }

    fn set_value(&self, id: ObjectId, tag: FieldTag, value: PropValue) -> StoreResult<()> {
        StoreDecorator::set_value(self, id, tag, value)
    }

    fn multi_string(&self, id: ObjectId, tag: FieldTag, ws: WsId) -> StoreResult<Option<String>> {
        StoreDecorator::multi_string(self, id, tag, ws)
    }

    fn set_multi_string(&self, id: ObjectId, tag: FieldTag, ws: WsId, text: &str) -> StoreResult<()> {
        StoreDecorator::set_multi_string(self, id, tag, ws, text)
    }

    fn is_cached(&self, id: ObjectId, tag: FieldTag) -> StoreResult<bool> {
        StoreDecorator::is_cached(self, id, tag)
    }

    fn evict(&self, id: ObjectId, tag: FieldTag) -> StoreResult<()> {
        StoreDecorator::evict(self, id, tag)
    }

    fn int(&self, id: ObjectId, tag: FieldTag) -> StoreResult<i64> {
        StoreDecorator::int(self, id, tag)
    }

    fn set_int(&self, id: ObjectId, tag: FieldTag, v: i64) -> StoreResult<()> {
        StoreDecorator::set_int(self, id, tag, v)
    }

    fn boolean(&self, id: ObjectId, tag: FieldTag) -> StoreResult<bool> {
        StoreDecorator::boolean(self, id, tag)
    }

    fn set_boolean(&self, id: ObjectId, tag: FieldTag, v: bool) -> StoreResult<()> {
        StoreDecorator::set_boolean(self, id, tag, v)
    }

    fn string(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Option<String>> {
        StoreDecorator::string(self, id, tag)
    }

    fn set_string(&self, id: ObjectId, tag: FieldTag, text: &str) -> StoreResult<()> {
        StoreDecorator::set_string(self, id, tag, text)
    }

    fn object(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Option<ObjectId>> {
        StoreDecorator::object(self, id, tag)
    }

    fn vector(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Vec<ObjectId>> {
        StoreDecorator::vector(self, id, tag)
    }

    fn replace_range(
        &self,
        id: ObjectId,
        tag: FieldTag,
        start: usize,
        end: usize,
        items: &[ObjectId],
    ) -> StoreResult<()> {
        StoreDecorator::replace_range(self, id, tag, start, end, items)
    }

    fn vector_size(&self, id: ObjectId, tag: FieldTag) -> StoreResult<usize> {
        StoreDecorator::vector_size(self, id, tag)
    }

    fn vector_item(&self, id: ObjectId, tag: FieldTag, index: usize) -> StoreResult<ObjectId> {
        StoreDecorator::vector_item(self, id, tag, index)
    }

    fn vector_index_of(&self, id: ObjectId, tag: FieldTag, item: ObjectId) -> StoreResult<Option<usize>> {
        StoreDecorator::vector_index_of(self, id, tag, item)
    }

    fn create_object(&self, class: ClassId) -> StoreResult<ObjectId> {
        StoreDecorator::create_object(self, class)
    }

    fn create_owned(
        &self,
        class: ClassId,
        owner: ObjectId,
        field: FieldTag,
        index: Option<usize>,
    ) -> StoreResult<ObjectId> {
        StoreDecorator::create_owned(self, class, owner, field, index)
    }

    fn delete_object(&self, id: ObjectId) -> StoreResult<()> {
        StoreDecorator::delete_object(self, id)
    }

    fn delete_with_owner_cleanup(&self, id: ObjectId) -> StoreResult<()> {
        StoreDecorator::delete_with_owner_cleanup(self, id)
    }

    fn change_owner(
        &self,
        id: ObjectId,
        new_owner: ObjectId,
        field: FieldTag,
        index: Option<usize>,
    ) -> StoreResult<()> {
        StoreDecorator::change_owner(self, id, new_owner, field, index)
    }

    fn insert_new_after(&self, after: ObjectId) -> StoreResult<ObjectId> {
        StoreDecorator::insert_new_after(self, after)
    }

    fn subscribe(&self, listener: Arc<dyn ChangeListener>) -> SubscriptionId {
        StoreDecorator::subscribe(self, listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        StoreDecorator::unsubscribe(self, id)
    }

    fn prop_changed(&self, change: &PropChange) {
        StoreDecorator::prop_changed(self, change)
    }

    fn metadata(&self) -> Arc<dyn MetadataCatalog> {
        StoreDecorator::metadata(self)
    }

    fn install_virtual(
        &self,
        class_name: &str,
        field_name: &str,
        kind: FieldKind,
        signature: Option<ClassId>,
    ) -> StoreResult<FieldTag> {
        StoreDecorator::install_virtual(self, class_name, field_name, kind, signature)
    }

    fn begin_task(&self, label: &str) -> StoreResult<()> {
        StoreDecorator::begin_task(self, label)
    }

    fn end_task(&self) -> StoreResult<()> {
        StoreDecorator::end_task(self)
    }

    fn continue_task(&self, label: &str) -> StoreResult<()> {
        StoreDecorator::continue_task(self, label)
    }

    fn break_task(&self) -> StoreResult<()> {
        StoreDecorator::break_task(self)
    }

    fn task_depth(&self) -> usize {
        StoreDecorator::task_depth(self)
    }

    fn is_disposed(&self) -> bool {
        StoreDecorator::is_disposed(self)
    }

    fn dispose(&self) {
        StoreDecorator::dispose(self)
    }
}

/// A decorator that overrides nothing.
///
/// Useful as a neutral layer in a decorator stack and as the reference for
/// what "transparent" means.
pub struct PassThroughStore {
    inner: Arc<dyn PropertyStore>,
}

impl PassThroughStore {
    pub fn new(inner: Arc<dyn PropertyStore>) -> Self {
        Self { inner }
    }

    /// Unwrap the decorated store.
    pub fn into_inner(self) -> Arc<dyn PropertyStore> {
        self.inner
    }
}

impl StoreDecorator for PassThroughStore {
    fn inner(&self) -> &dyn PropertyStore {
        self.inner.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use lexo_meta::InMemoryCatalog;

    use super::*;
    use crate::error::StoreError;

    /// A fake store that records every call and answers with canned values.
    struct RecordingStore {
        calls: Mutex<Vec<String>>,
        catalog: Arc<dyn MetadataCatalog>,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                catalog: Arc::new(InMemoryCatalog::new()),
            }
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.calls.lock().unwrap())
        }
    }

    impl PropertyStore for RecordingStore {
        fn class_of(&self, id: ObjectId) -> StoreResult<Option<ClassId>> {
            self.record(format!("class_of({id})"));
            Ok(Some(ClassId(id.raw() as u32 % 3)))
        }
        fn ids_of_class(&self, class: ClassId) -> StoreResult<Vec<ObjectId>> {
            self.record(format!("ids_of_class({class})"));
            Ok(vec![ObjectId::new(1), ObjectId::new(2)])
        }
        fn instance_count(&self, class: ClassId) -> StoreResult<usize> {
            self.record(format!("instance_count({class})"));
            Ok(7)
        }
        fn fetch_records(&self, class: ClassId, scope: LoadScope<'_>) -> StoreResult<Vec<ObjectRecord>> {
            self.record(format!("fetch_records({class}, {scope:?})"));
            Ok(vec![ObjectRecord { id: ObjectId::new(1), class, owner: None }])
        }
        fn exists(&self, id: ObjectId) -> StoreResult<bool> {
            self.record(format!("exists({id})"));
            Ok(id.raw() % 2 == 0)
        }
        fn owner_of(&self, id: ObjectId) -> StoreResult<Option<Ownership>> {
            self.record(format!("owner_of({id})"));
            Ok(None)
        }
        fn value(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Option<PropValue>> {
            self.record(format!("value({id}, {tag})"));
            Ok(Some(PropValue::Integer(id.raw())))
        }
        fn set_value(&self, id: ObjectId, tag: FieldTag, value: PropValue) -> StoreResult<()> {
            self.record(format!("set_value({id}, {tag}, {value:?})"));
            Ok(())
        }
        fn multi_string(&self, id: ObjectId, tag: FieldTag, ws: WsId) -> StoreResult<Option<String>> {
            self.record(format!("multi_string({id}, {tag}, {ws})"));
            Ok(Some("gloss".into()))
        }
        fn set_multi_string(&self, id: ObjectId, tag: FieldTag, ws: WsId, text: &str) -> StoreResult<()> {
            self.record(format!("set_multi_string({id}, {tag}, {ws}, {text})"));
            Ok(())
        }
        fn is_cached(&self, id: ObjectId, tag: FieldTag) -> StoreResult<bool> {
            self.record(format!("is_cached({id}, {tag})"));
            Ok(true)
        }
        fn evict(&self, id: ObjectId, tag: FieldTag) -> StoreResult<()> {
            self.record(format!("evict({id}, {tag})"));
            Ok(())
        }
        fn vector(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Vec<ObjectId>> {
            self.record(format!("vector({id}, {tag})"));
            Ok(vec![ObjectId::new(10), ObjectId::new(20)])
        }
        fn replace_range(
            &self,
            id: ObjectId,
            tag: FieldTag,
            start: usize,
            end: usize,
            items: &[ObjectId],
        ) -> StoreResult<()> {
            self.record(format!("replace_range({id}, {tag}, {start}, {end}, {items:?})"));
            Err(StoreError::RangeOutOfBounds { start, end, len: 0 })
        }
        fn create_object(&self, class: ClassId) -> StoreResult<ObjectId> {
            self.record(format!("create_object({class})"));
            Ok(ObjectId::new(100))
        }
        fn create_owned(
            &self,
            class: ClassId,
            owner: ObjectId,
            field: FieldTag,
            index: Option<usize>,
        ) -> StoreResult<ObjectId> {
            self.record(format!("create_owned({class}, {owner}, {field}, {index:?})"));
            Ok(ObjectId::new(101))
        }
        fn delete_object(&self, id: ObjectId) -> StoreResult<()> {
            self.record(format!("delete_object({id})"));
            Err(StoreError::NotFound(id))
        }
        fn delete_with_owner_cleanup(&self, id: ObjectId) -> StoreResult<()> {
            self.record(format!("delete_with_owner_cleanup({id})"));
            Ok(())
        }
        fn change_owner(
            &self,
            id: ObjectId,
            new_owner: ObjectId,
            field: FieldTag,
            index: Option<usize>,
        ) -> StoreResult<()> {
            self.record(format!("change_owner({id}, {new_owner}, {field}, {index:?})"));
            Ok(())
        }
        fn insert_new_after(&self, after: ObjectId) -> StoreResult<ObjectId> {
            self.record(format!("insert_new_after({after})"));
            Ok(ObjectId::new(102))
        }
        fn subscribe(&self, _listener: Arc<dyn ChangeListener>) -> SubscriptionId {
            self.record("subscribe".into());
            SubscriptionId(5)
        }
        fn unsubscribe(&self, id: SubscriptionId) -> bool {
            self.record(format!("unsubscribe({})", id.0));
            true
        }
        fn prop_changed(&self, change: &PropChange) {
            self.record(format!("prop_changed({change:?})"));
        }
        fn metadata(&self) -> Arc<dyn MetadataCatalog> {
            self.record("metadata".into());
            Arc::clone(&self.catalog)
        }
        fn install_virtual(
            &self,
            class_name: &str,
            field_name: &str,
            kind: FieldKind,
            signature: Option<ClassId>,
        ) -> StoreResult<FieldTag> {
            self.record(format!("install_virtual({class_name}, {field_name}, {kind}, {signature:?})"));
            Ok(FieldTag(9_501))
        }
        fn begin_task(&self, label: &str) -> StoreResult<()> {
            self.record(format!("begin_task({label})"));
            Ok(())
        }
        fn end_task(&self) -> StoreResult<()> {
            self.record("end_task".into());
            Err(StoreError::NoOpenTask)
        }
        fn continue_task(&self, label: &str) -> StoreResult<()> {
            self.record(format!("continue_task({label})"));
            Ok(())
        }
        fn break_task(&self) -> StoreResult<()> {
            self.record("break_task".into());
            Ok(())
        }
        fn task_depth(&self) -> usize {
            self.record("task_depth".into());
            3
        }
        fn is_disposed(&self) -> bool {
            self.record("is_disposed".into());
            false
        }
        fn dispose(&self) {
            self.record("dispose".into());
        }
    }

    struct Noop;
    impl ChangeListener for Noop {
        fn prop_changed(&self, _: &PropChange) {}
    }

    /// Run the same script against `store` and return a rendering of every
    /// result.
    fn script(store: &dyn PropertyStore) -> Vec<String> {
        let id = ObjectId::new(4);
        let tag = FieldTag(2001);
        let ws = WsId(1);
        let change = PropChange::splice(id, tag, 0, 1, 0);
        vec![
            format!("{:?}", store.class_of(id)),
            format!("{:?}", store.ids_of_class(ClassId(2))),
            format!("{:?}", store.instance_count(ClassId(2))),
            format!("{:?}", store.fetch_records(ClassId(2), LoadScope::Exact(&[id]))),
            format!("{:?}", store.exists(id)),
            format!("{:?}", store.owner_of(id)),
            format!("{:?}", store.value(id, tag)),
            format!("{:?}", store.set_value(id, tag, PropValue::Boolean(true))),
            format!("{:?}", store.multi_string(id, tag, ws)),
            format!("{:?}", store.set_multi_string(id, tag, ws, "run")),
            format!("{:?}", store.is_cached(id, tag)),
            format!("{:?}", store.evict(id, tag)),
            format!("{:?}", store.int(id, tag)),
            format!("{:?}", store.set_int(id, tag, 3)),
            format!("{:?}", store.vector(id, tag)),
            format!("{:?}", store.replace_range(id, tag, 0, 1, &[id])),
            format!("{:?}", store.vector_size(id, tag)),
            format!("{:?}", store.vector_item(id, tag, 1)),
            format!("{:?}", store.vector_index_of(id, tag, ObjectId::new(20))),
            format!("{:?}", store.create_object(ClassId(2))),
            format!("{:?}", store.create_owned(ClassId(2), id, tag, Some(0))),
            format!("{:?}", store.delete_object(id)),
            format!("{:?}", store.delete_with_owner_cleanup(id)),
            format!("{:?}", store.change_owner(id, ObjectId::new(8), tag, None)),
            format!("{:?}", store.insert_new_after(id)),
            format!("{:?}", store.subscribe(Arc::new(Noop))),
            format!("{:?}", store.unsubscribe(SubscriptionId(5))),
            {
                store.prop_changed(&change);
                "()".to_string()
            },
            format!("{:?}", store.install_virtual("LexEntry", "X", FieldKind::Integer, None)),
            format!("{:?}", store.begin_task("t")),
            format!("{:?}", store.end_task()),
            format!("{:?}", store.continue_task("t2")),
            format!("{:?}", store.break_task()),
            format!("{:?}", store.task_depth()),
            format!("{:?}", store.is_disposed()),
            {
                store.dispose();
                "()".to_string()
            },
        ]
    }

    #[test]
    fn pass_through_is_transparent() {
        let fake = Arc::new(RecordingStore::new());
        let direct = script(fake.as_ref());
        let direct_calls = fake.take();

        let decorated = PassThroughStore::new(fake.clone());
        let via_decorator = script(&decorated);
        let decorator_calls = fake.take();

        assert_eq!(direct, via_decorator);
        assert_eq!(direct_calls, decorator_calls);
    }

    #[test]
    fn prop_changed_is_forwarded_exactly_once() {
        let fake = Arc::new(RecordingStore::new());
        let decorated = PassThroughStore::new(fake.clone());
        let change = PropChange::scalar(ObjectId::new(1), FieldTag(7));
        PropertyStore::prop_changed(&decorated, &change);
        let calls = fake.take();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("prop_changed"));
    }

    #[test]
    fn decorators_stack() {
        let fake = Arc::new(RecordingStore::new());
        let inner: Arc<dyn PropertyStore> = Arc::new(PassThroughStore::new(fake.clone()));
        let outer = PassThroughStore::new(inner);
        assert_eq!(PropertyStore::instance_count(&outer, ClassId(1)).unwrap(), 7);
        assert_eq!(fake.take(), vec!["instance_count(class:1)".to_string()]);
    }

    struct CountingReads {
        inner: Arc<dyn PropertyStore>,
        reads: Mutex<usize>,
    }

    impl StoreDecorator for CountingReads {
        fn inner(&self) -> &dyn PropertyStore {
            self.inner.as_ref()
        }

        fn vector(&self, id: ObjectId, tag: FieldTag) -> StoreResult<Vec<ObjectId>> {
            *self.reads.lock().unwrap() += 1;
            self.inner.vector(id, tag)
        }
    }

    #[test]
    fn override_intercepts_only_its_operation() {
        let fake = Arc::new(RecordingStore::new());
        let counting = CountingReads {
            inner: fake.clone(),
            reads: Mutex::new(0),
        };
        let store: &dyn PropertyStore = &counting;
        store.vector(ObjectId::new(1), FieldTag(1)).unwrap();
        store.vector_size(ObjectId::new(1), FieldTag(1)).unwrap();
        assert_eq!(*counting.reads.lock().unwrap(), 1);
        assert_eq!(fake.take().len(), 2);
    }
}
