//! Simulated managed heap
//!
//! [`SimHeap`] is a small object model good enough to drive the transaction
//! layer in tests: classes, instances, primitive and object arrays, strings
//! and string-constant caches, a publishable base image, and a moving
//! collector primitive ([`SimHeap::move_object`]).
//!
//! ## Layout
//!
//! Every object has its class reference at [`CLASS_OFFSET`]. Arrays store
//! their length as a 32-bit field at [`ARRAY_LENGTH_OFFSET`]. Object array
//! elements are reference fields at [`SimHeap::element_offset`], primitive
//! array elements live in a separate raw element vector.

use preinit_core::{
    ArrayElement, ExtensionPolicy, FieldKind, FieldValue, ImageSpaces, MemberOffset, ObjectModel,
    ObjectRef, PrimitiveType, StringCache, StringIndex, ARRAY_LENGTH_OFFSET, CLASS_OFFSET,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

const FIRST_ADDRESS: u64 = 0x1000;
const OBJECT_ALIGNMENT: u64 = 0x40;
const FIRST_ELEMENT_OFFSET: u32 = 16;

#[derive(Debug, Clone, Copy)]
struct Slot {
    kind: FieldKind,
    raw: u64,
}

#[derive(Debug, Clone)]
enum Body {
    Instance,
    Class {
        descriptor: String,
        component: Option<PrimitiveType>,
    },
    PrimitiveArray {
        elements: Vec<u64>,
    },
    ObjectArray,
    String {
        value: String,
    },
    StringCache {
        slots: Vec<Option<ObjectRef>>,
    },
}

#[derive(Debug, Clone)]
struct SimObject {
    fields: BTreeMap<u32, Slot>,
    body: Body,
}

/// In-memory object model, image spaces and extension policy
#[derive(Debug)]
pub struct SimHeap {
    objects: FxHashMap<ObjectRef, SimObject>,
    next_address: u64,
    class_class: Option<ObjectRef>,
    string_class: Option<ObjectRef>,
    cache_class: Option<ObjectRef>,
    array_classes: FxHashMap<PrimitiveType, ObjectRef>,
    base_image: FxHashSet<ObjectRef>,
    has_base_image: bool,
    extension_forbidden: FxHashSet<ObjectRef>,
    volatile_stores: usize,
}

impl Default for SimHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHeap {
    /// Create an empty heap without a base image
    pub fn new() -> Self {
        SimHeap {
            objects: FxHashMap::default(),
            next_address: FIRST_ADDRESS,
            class_class: None,
            string_class: None,
            cache_class: None,
            array_classes: FxHashMap::default(),
            base_image: FxHashSet::default(),
            has_base_image: false,
            extension_forbidden: FxHashSet::default(),
            volatile_stores: 0,
        }
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    fn next_ref(&mut self) -> ObjectRef {
        let addr = self.next_address;
        self.next_address += OBJECT_ALIGNMENT;
        match ObjectRef::new(addr) {
            Some(obj) => obj,
            None => unreachable!("heap addresses start above zero"),
        }
    }

    fn alloc(&mut self, class: Option<ObjectRef>, body: Body) -> ObjectRef {
        let obj = self.next_ref();
        // A missing class means the object is its own class (the class class).
        let class = class.unwrap_or(obj);
        let mut fields = BTreeMap::new();
        fields.insert(
            CLASS_OFFSET.value(),
            Slot {
                kind: FieldKind::Reference,
                raw: class.addr(),
            },
        );
        self.objects.insert(obj, SimObject { fields, body });
        obj
    }

    fn class_class(&mut self) -> ObjectRef {
        if let Some(class) = self.class_class {
            return class;
        }
        let class = self.alloc(
            None,
            Body::Class {
                descriptor: "Ljava/lang/Class;".to_string(),
                component: None,
            },
        );
        self.class_class = Some(class);
        class
    }

    fn alloc_class_with(&mut self, descriptor: &str, component: Option<PrimitiveType>) -> ObjectRef {
        let class_class = self.class_class();
        self.alloc(
            Some(class_class),
            Body::Class {
                descriptor: descriptor.to_string(),
                component,
            },
        )
    }

    /// Allocate a non-array class
    pub fn alloc_class(&mut self, descriptor: &str) -> ObjectRef {
        self.alloc_class_with(descriptor, None)
    }

    /// Allocate an instance of `class`
    pub fn alloc_instance(&mut self, class: ObjectRef) -> ObjectRef {
        self.alloc(Some(class), Body::Instance)
    }

    fn with_length(&mut self, array: ObjectRef, length: usize) -> ObjectRef {
        self.object_mut(array).fields.insert(
            ARRAY_LENGTH_OFFSET.value(),
            Slot {
                kind: FieldKind::Bits32,
                raw: length as u64,
            },
        );
        array
    }

    /// Allocate a zeroed primitive array
    ///
    /// # Panics
    ///
    /// Panics if `component` is not one of the eight primitive types.
    pub fn alloc_primitive_array(&mut self, component: PrimitiveType, length: usize) -> ObjectRef {
        assert!(component.is_primitive(), "{component} arrays are not primitive");
        let class = match self.array_classes.get(&component) {
            Some(&class) => class,
            None => {
                let descriptor = format!("[{}", component.descriptor());
                let class = self.alloc_class_with(&descriptor, Some(component));
                self.array_classes.insert(component, class);
                class
            }
        };
        let array = self.alloc(
            Some(class),
            Body::PrimitiveArray {
                elements: vec![0; length],
            },
        );
        self.with_length(array, length)
    }

    /// Allocate an array of references to `element_class`, all null
    pub fn alloc_object_array(&mut self, element_class: ObjectRef, length: usize) -> ObjectRef {
        let descriptor = format!("[{}", self.descriptor(element_class));
        let class = self.alloc_class_with(&descriptor, Some(PrimitiveType::Not));
        let array = self.alloc(Some(class), Body::ObjectArray);
        self.with_length(array, length)
    }

    /// Allocate a string object
    pub fn alloc_string(&mut self, value: &str) -> ObjectRef {
        let class = match self.string_class {
            Some(class) => class,
            None => {
                let class = self.alloc_class("Ljava/lang/String;");
                self.string_class = Some(class);
                class
            }
        };
        self.alloc(
            Some(class),
            Body::String {
                value: value.to_string(),
            },
        )
    }

    /// Allocate a string-constant cache with `num_strings` unresolved slots
    pub fn alloc_string_cache(&mut self, num_strings: u32) -> ObjectRef {
        let class = match self.cache_class {
            Some(class) => class,
            None => {
                let class = self.alloc_class("Ljava/lang/DexCache;");
                self.cache_class = Some(class);
                class
            }
        };
        self.alloc(
            Some(class),
            Body::StringCache {
                slots: vec![None; num_strings as usize],
            },
        )
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    fn object(&self, obj: ObjectRef) -> &SimObject {
        match self.objects.get(&obj) {
            Some(object) => object,
            None => panic!("dangling reference {obj}"),
        }
    }

    fn object_mut(&mut self, obj: ObjectRef) -> &mut SimObject {
        match self.objects.get_mut(&obj) {
            Some(object) => object,
            None => panic!("dangling reference {obj}"),
        }
    }

    /// Whether `obj` is a live object of this heap
    pub fn contains(&self, obj: ObjectRef) -> bool {
        self.objects.contains_key(&obj)
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the heap holds no objects
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Descriptor of a class
    pub fn descriptor(&self, class: ObjectRef) -> &str {
        match &self.object(class).body {
            Body::Class { descriptor, .. } => descriptor,
            _ => panic!("{class} is not a class"),
        }
    }

    /// Contents of a string object
    pub fn string_value(&self, string: ObjectRef) -> &str {
        match &self.object(string).body {
            Body::String { value } => value,
            _ => panic!("{string} is not a string"),
        }
    }

    /// Array length as stored in the length field
    pub fn array_length(&self, array: ObjectRef) -> usize {
        let raw = self
            .object(array)
            .fields
            .get(&ARRAY_LENGTH_OFFSET.value())
            .map_or(0, |slot| slot.raw);
        raw as usize
    }

    /// Field offset of element `index` of an object array
    pub fn element_offset(index: usize) -> MemberOffset {
        MemberOffset::new(FIRST_ELEMENT_OFFSET + 4 * index as u32)
    }

    /// Number of volatile field stores performed so far
    pub fn volatile_stores(&self) -> usize {
        self.volatile_stores
    }

    // ========================================================================
    // Image spaces
    // ========================================================================

    /// Freeze every object allocated so far into a published base image
    pub fn publish_base_image(&mut self) {
        self.base_image.extend(self.objects.keys().copied());
        self.has_base_image = true;
    }

    /// Forbid referencing instances of `class` from an image extension
    pub fn forbid_in_extension(&mut self, class: ObjectRef) {
        self.extension_forbidden.insert(class);
    }

    // ========================================================================
    // Collection
    // ========================================================================

    /// Move `obj` to a fresh address, as a copying collector would
    ///
    /// Every reference held by the heap itself (fields, cache slots, base
    /// image membership) is updated. References held outside the heap must
    /// be fixed by a root scan with a [`Relocator`](crate::Relocator).
    pub fn move_object(&mut self, obj: ObjectRef) -> ObjectRef {
        let new = self.next_ref();
        let object = match self.objects.remove(&obj) {
            Some(object) => object,
            None => panic!("dangling reference {obj}"),
        };
        self.objects.insert(new, object);

        let forward = |r: &mut ObjectRef| {
            if *r == obj {
                *r = new;
            }
        };

        for object in self.objects.values_mut() {
            for slot in object.fields.values_mut() {
                if slot.kind == FieldKind::Reference && slot.raw == obj.addr() {
                    slot.raw = new.addr();
                }
            }
            if let Body::StringCache { slots } = &mut object.body {
                slots.iter_mut().flatten().for_each(forward);
            }
        }
        for class in [
            &mut self.class_class,
            &mut self.string_class,
            &mut self.cache_class,
        ] {
            class.iter_mut().for_each(forward);
        }
        self.array_classes.values_mut().for_each(forward);
        if self.base_image.remove(&obj) {
            self.base_image.insert(new);
        }
        if self.extension_forbidden.remove(&obj) {
            self.extension_forbidden.insert(new);
        }
        new
    }
}

impl ObjectModel for SimHeap {
    fn is_class(&self, obj: ObjectRef) -> bool {
        matches!(self.object(obj).body, Body::Class { .. })
    }

    fn is_array(&self, obj: ObjectRef) -> bool {
        matches!(
            self.object(obj).body,
            Body::PrimitiveArray { .. } | Body::ObjectArray
        )
    }

    fn class_of(&self, obj: ObjectRef) -> ObjectRef {
        let raw = self
            .object(obj)
            .fields
            .get(&CLASS_OFFSET.value())
            .map_or(0, |slot| slot.raw);
        match ObjectRef::new(raw) {
            Some(class) => class,
            None => panic!("{obj} has no class"),
        }
    }

    fn component_type(&self, array: ObjectRef) -> PrimitiveType {
        let class = self.class_of(array);
        match self.object(class).body {
            Body::Class {
                component: Some(component),
                ..
            } => component,
            _ => panic!("{array} is not an array"),
        }
    }

    fn load_field(
        &self,
        obj: ObjectRef,
        offset: MemberOffset,
        kind: FieldKind,
        _is_volatile: bool,
    ) -> FieldValue {
        let raw = self
            .object(obj)
            .fields
            .get(&offset.value())
            .map_or(0, |slot| slot.raw);
        FieldValue::from_raw(kind, raw)
    }

    fn store_field(
        &mut self,
        obj: ObjectRef,
        offset: MemberOffset,
        value: FieldValue,
        is_volatile: bool,
    ) {
        if is_volatile {
            self.volatile_stores += 1;
        }
        self.object_mut(obj).fields.insert(
            offset.value(),
            Slot {
                kind: value.kind(),
                raw: value.raw(),
            },
        );
    }

    fn load_element(&self, array: ObjectRef, index: usize) -> ArrayElement {
        let component = self.component_type(array);
        let raw = match &self.object(array).body {
            Body::PrimitiveArray { elements } => elements[index],
            _ => panic!("{array} is not a primitive array"),
        };
        match ArrayElement::from_raw(component, raw) {
            Some(element) => element,
            None => panic!("{array} has component type {component}"),
        }
    }

    fn store_element(&mut self, array: ObjectRef, index: usize, value: ArrayElement) {
        let component = self.component_type(array);
        assert_eq!(
            value.primitive_type(),
            component,
            "element type mismatch for {array}"
        );
        match &mut self.object_mut(array).body {
            Body::PrimitiveArray { elements } => elements[index] = value.to_raw(),
            _ => panic!("{array} is not a primitive array"),
        }
    }
}

impl StringCache for SimHeap {
    fn num_strings(&self, cache: ObjectRef) -> u32 {
        match &self.object(cache).body {
            Body::StringCache { slots } => slots.len() as u32,
            _ => panic!("{cache} is not a string cache"),
        }
    }

    fn resolved_string(&self, cache: ObjectRef, index: StringIndex) -> Option<ObjectRef> {
        match &self.object(cache).body {
            Body::StringCache { slots } => slots[index.value() as usize],
            _ => panic!("{cache} is not a string cache"),
        }
    }

    fn set_resolved_string(&mut self, cache: ObjectRef, index: StringIndex, string: ObjectRef) {
        match &mut self.object_mut(cache).body {
            Body::StringCache { slots } => slots[index.value() as usize] = Some(string),
            _ => panic!("{cache} is not a string cache"),
        }
    }

    fn clear_string(&mut self, cache: ObjectRef, index: StringIndex) {
        match &mut self.object_mut(cache).body {
            Body::StringCache { slots } => slots[index.value() as usize] = None,
            _ => panic!("{cache} is not a string cache"),
        }
    }
}

impl ImageSpaces for SimHeap {
    fn is_in_base_image(&self, obj: ObjectRef) -> bool {
        self.base_image.contains(&obj)
    }

    fn has_base_image(&self) -> bool {
        self.has_base_image
    }
}

impl ExtensionPolicy for SimHeap {
    fn can_reference_in_extension(&self, class: ObjectRef) -> bool {
        !self.extension_forbidden.contains(&class)
    }
}
