//! Round-trip tests for object graphs: shared children, cycles,
//! self-references, and compound arrays must reconstruct to shared values.

use snowball::{BufferStream, CompoundId, Mode, Reader, Result, Writer};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

const ROOT: u32 = 0x544F4F52;
const NEXT: u32 = 0x5458454E;
const LABEL: u32 = 0x4C424C;
const TAG: u32 = 0x474154;
const CHILD: u32 = 0x444C4843;
const PARENT_A: u32 = 0x41524150;
const PARENT_B: u32 = 0x42524150;
const LIST: u32 = 0x5453494C;

const F: u32 = 0x46;
const U: u32 = 0x55;
const I: u32 = 0x49;
const FS: u32 = 0x4653;
const US: u32 = 0x5553;
const IS: u32 = 0x4953;
const B: u32 = 0x42;

type SinkWriter = Writer<BufferStream>;

#[derive(Debug, Default)]
struct NodeData {
    label: i32,
    next: Option<NodeLink>,
}

type NodeLink = Rc<RefCell<NodeData>>;

fn write_file(build: impl FnOnce(&mut SinkWriter) -> Result<()>) -> Vec<u8> {
    let mut writer = Writer::new();
    writer.set_stream(BufferStream::new(Mode::Writer)).unwrap();
    writer.open().unwrap();
    build(&mut writer).unwrap();
    writer.close().unwrap();
    writer.take_stream().unwrap().into_vec()
}

fn reader_over<V: Clone>(bytes: Vec<u8>) -> Reader<BufferStream, V> {
    let mut reader = Reader::new();
    reader
        .set_stream(BufferStream::from_vec(bytes, Mode::Reader))
        .unwrap();
    reader.open().unwrap();
    reader
}

fn num_compounds(bytes: &[u8]) -> u32 {
    u32::from_le_bytes(bytes[8..12].try_into().unwrap())
}

#[test]
fn primitives_round_trip() {
    let bytes = write_file(|w| {
        w.write_float(F, 1.5)?;
        w.write_uint(U, 0xDEAD_BEEF)?;
        w.write_int(I, -12)?;
        w.write_floats(FS, &[0.25, -0.5])?;
        w.write_uints(US, &[9, 8])?;
        w.write_ints(IS, &[1, -2, 3])?;
        w.write_bytes(B, b"snowball")?;
        Ok(())
    });

    let mut r: Reader<BufferStream, ()> = reader_over(bytes);
    assert_eq!(r.read_float(F).unwrap(), 1.5);
    assert_eq!(r.read_uint(U).unwrap(), 0xDEAD_BEEF);
    assert_eq!(r.read_int(I).unwrap(), -12);
    assert_eq!(r.read_floats(FS).unwrap(), Some(vec![0.25, -0.5]));
    assert_eq!(r.read_uints(US).unwrap(), Some(vec![9, 8]));
    assert_eq!(r.read_ints(IS).unwrap(), Some(vec![1, -2, 3]));
    assert_eq!(r.read_bytes(B).unwrap().as_deref(), Some(&b"snowball"[..]));
    r.close().unwrap();
}

#[test]
fn empty_session_round_trips() {
    let bytes = write_file(|_| Ok(()));
    assert_eq!(num_compounds(&bytes), 0);
    let mut reader: Reader<BufferStream, ()> = reader_over(bytes);
    reader.close().unwrap();
}

#[test]
fn null_compound_round_trips_as_none() {
    let bytes = write_file(|w| w.write_compound(ROOT, None, |_, _| Ok(())));
    let mut r: Reader<BufferStream, ()> = reader_over(bytes);
    assert!(r.read_compound(ROOT, |_| Ok(())).unwrap().is_none());
}

fn write_leaf(id: CompoundId, w: &mut SinkWriter) -> Result<()> {
    w.write_int(TAG, id.0 as i32)
}

fn write_child(_id: CompoundId, w: &mut SinkWriter) -> Result<()> {
    w.write_int(TAG, 99)
}

fn write_parent(_id: CompoundId, w: &mut SinkWriter) -> Result<()> {
    w.write_compound(CHILD, Some(CompoundId(3)), write_child)
}

#[test]
fn shared_child_deduplicates() {
    let bytes = write_file(|w| {
        w.write_compound(PARENT_A, Some(CompoundId(1)), write_parent)?;
        w.write_compound(PARENT_B, Some(CompoundId(2)), write_parent)?;
        Ok(())
    });
    // Two parents plus exactly one child body.
    assert_eq!(num_compounds(&bytes), 3);

    #[derive(Debug)]
    enum Node {
        Parent(Option<Rc<RefCell<Node>>>),
        Child(i32),
    }
    type Link = Rc<RefCell<Node>>;

    fn read_child(r: &mut Reader<BufferStream, Link>) -> Result<()> {
        let node = Rc::new(RefCell::new(Node::Child(0)));
        r.publish(node.clone())?;
        let tag = r.read_int(TAG)?;
        *node.borrow_mut() = Node::Child(tag);
        Ok(())
    }

    fn read_parent(r: &mut Reader<BufferStream, Link>) -> Result<()> {
        let node = Rc::new(RefCell::new(Node::Parent(None)));
        r.publish(node.clone())?;
        let child = r.read_compound(CHILD, read_child)?;
        *node.borrow_mut() = Node::Parent(child);
        Ok(())
    }

    let mut r: Reader<BufferStream, Link> = reader_over(bytes);
    let a = r.read_compound(PARENT_A, read_parent).unwrap().unwrap();
    let b = r.read_compound(PARENT_B, read_parent).unwrap().unwrap();

    let child_of = |link: &Link| match &*link.borrow() {
        Node::Parent(Some(child)) => child.clone(),
        other => panic!("expected a populated parent, got {other:?}"),
    };
    let child_a = child_of(&a);
    let child_b = child_of(&b);
    assert!(Rc::ptr_eq(&child_a, &child_b));
    assert!(matches!(&*child_a.borrow(), Node::Child(99)));
}

fn write_cycle_node(id: CompoundId, w: &mut SinkWriter) -> Result<()> {
    let next = if id.0 == 1 { CompoundId(2) } else { CompoundId(1) };
    w.write_compound(NEXT, Some(next), write_cycle_node)?;
    w.write_int(LABEL, id.0 as i32)
}

fn read_node(r: &mut Reader<BufferStream, NodeLink>) -> Result<()> {
    // Publish before the nested read so back-references resolve to this
    // allocation.
    let node = Rc::new(RefCell::new(NodeData::default()));
    r.publish(node.clone())?;
    let next = r.read_compound(NEXT, read_node)?;
    let label = r.read_int(LABEL)?;
    let mut data = node.borrow_mut();
    data.next = next;
    data.label = label;
    Ok(())
}

#[test]
fn cycle_round_trips_to_shared_pointers() {
    let bytes = write_file(|w| w.write_compound(ROOT, Some(CompoundId(1)), write_cycle_node));
    assert_eq!(num_compounds(&bytes), 2);

    let mut r: Reader<BufferStream, NodeLink> = reader_over(bytes);
    let first = r.read_compound(ROOT, read_node).unwrap().unwrap();
    assert_eq!(first.borrow().label, 1);

    let second = first.borrow().next.clone().unwrap();
    assert_eq!(second.borrow().label, 2);
    let back = second.borrow().next.clone().unwrap();
    assert!(Rc::ptr_eq(&back, &first));
}

fn write_selfref(id: CompoundId, w: &mut SinkWriter) -> Result<()> {
    // The identity is already registered, so this emits a reference without
    // re-entering the writer.
    w.write_compound(NEXT, Some(id), write_selfref)?;
    w.write_int(LABEL, 5)
}

#[test]
fn self_referential_compound_round_trips() {
    let bytes = write_file(|w| w.write_compound(ROOT, Some(CompoundId(1)), write_selfref));
    assert_eq!(num_compounds(&bytes), 1);

    let mut r: Reader<BufferStream, NodeLink> = reader_over(bytes);
    let node = r.read_compound(ROOT, read_node).unwrap().unwrap();
    assert_eq!(node.borrow().label, 5);
    let inner = node.borrow().next.clone().unwrap();
    assert!(Rc::ptr_eq(&inner, &node));
}

#[test]
fn late_publication_leaves_back_references_null() {
    // A reader that only publishes after its nested reads: the cycle's
    // back-reference observes the not-yet-published slot and comes back
    // `None`. Documented behavior, not an error.
    fn read_late(r: &mut Reader<BufferStream, NodeLink>) -> Result<()> {
        let next = r.read_compound(NEXT, read_late)?;
        let label = r.read_int(LABEL)?;
        r.publish(Rc::new(RefCell::new(NodeData { label, next })))?;
        Ok(())
    }

    let bytes = write_file(|w| w.write_compound(ROOT, Some(CompoundId(1)), write_cycle_node));
    let mut r: Reader<BufferStream, NodeLink> = reader_over(bytes);
    let first = r.read_compound(ROOT, read_late).unwrap().unwrap();
    let second = first.borrow().next.clone().unwrap();
    assert!(second.borrow().next.is_none());
}

#[test]
fn compound_array_resolves_duplicates() {
    let bytes = write_file(|w| {
        w.write_compounds(
            LIST,
            &[CompoundId(1), CompoundId(2), CompoundId(1)],
            write_leaf,
        )
    });
    assert_eq!(num_compounds(&bytes), 2);

    let calls = Cell::new(0);
    let mut r: Reader<BufferStream, Rc<Cell<i32>>> = reader_over(bytes);
    let items = r
        .read_compounds(LIST, |r| {
            calls.set(calls.get() + 1);
            let value = Rc::new(Cell::new(0));
            r.publish(value.clone())?;
            value.set(r.read_int(TAG)?);
            Ok(())
        })
        .unwrap()
        .unwrap();

    assert_eq!(items.len(), 3);
    // Three reference sites, two expansions.
    assert_eq!(calls.get(), 2);
    let first = items[0].clone().unwrap();
    assert!(Rc::ptr_eq(&first, items[2].as_ref().unwrap()));
    assert_eq!(first.get(), 1);
    assert_eq!(items[1].as_ref().unwrap().get(), 2);
}

#[test]
fn empty_compound_array_round_trips_as_none() {
    let bytes = write_file(|w| w.write_compounds(LIST, &[], |_, _| Ok(())));
    let mut r: Reader<BufferStream, ()> = reader_over(bytes);
    assert!(r.read_compounds(LIST, |_| Ok(())).unwrap().is_none());
}

#[test]
fn compounds_interleave_with_main_body_chunks() {
    // The compound reference must land in the buffer that was active at the
    // call site, so surrounding chunks stay in writer order.
    let bytes = write_file(|w| {
        w.write_int(I, 1)?;
        w.write_compound(ROOT, Some(CompoundId(1)), write_leaf)?;
        w.write_int(LABEL, 2)?;
        Ok(())
    });

    let mut r: Reader<BufferStream, Rc<Cell<i32>>> = reader_over(bytes);
    assert_eq!(r.read_int(I).unwrap(), 1);
    let leaf = r
        .read_compound(ROOT, |r| {
            let value = Rc::new(Cell::new(0));
            r.publish(value.clone())?;
            value.set(r.read_int(TAG)?);
            Ok(())
        })
        .unwrap()
        .unwrap();
    assert_eq!(leaf.get(), 1);
    assert_eq!(r.read_int(LABEL).unwrap(), 2);
}
