use hcl_model::model::Ty;
use hcl_model::{ConversionKind, DiagnosticKind, Model, Schema, TypeId, parse_path};
use serde_json::json;

fn pets_model() -> Model {
    let schema = Schema::from_value(json!({ "types": {
        "Dog": { "object": { "kind": "string", "name": "string", "breed": "string", "age": "int" } },
        "Cat": { "object": { "kind": "string", "name": "string", "lives": "int", "age": "number" } },
        "Pet": { "discriminated_union": { "discriminator": "kind", "mapping": { "dog": "Dog", "cat": "Cat" } } },
        "PetAgain": { "discriminated_union": { "discriminator": "kind", "mapping": { "cat": "Cat", "dog": "Dog" } } },
        "CatLike": { "object": { "kind": "string", "name": "string", "lives": "int", "age": "number" } },
        "Walker": { "object": { "kind": "string", "name": "string", "breed": { "optional": "bool" } } },
        "Named": { "object": { "kind": "string", "name": "string", "lives": "int" } },
        "Aged": { "object": { "age": "int" } },
    }}))
    .unwrap();
    schema.build().unwrap()
}

fn traverse(model: &mut Model, receiver: &str, path: &str) -> (String, Vec<DiagnosticKind>) {
    let receiver = model.lookup(receiver).unwrap();
    let steps = parse_path(path).unwrap();
    let (ty, diagnostics) = model.arena.traverse_path(receiver, &steps);
    let kinds = diagnostics.iter().map(|d| d.kind).collect();
    (model.arena.display(ty).to_string(), kinds)
}

#[test]
fn display_is_deterministic_and_sorted() {
    let model = pets_model();
    let pet = model.lookup("Pet").unwrap();
    let again = model.lookup("PetAgain").unwrap();
    let expected = "discriminated_union(kind, \
        cat=object({age = number, kind = string, lives = int, name = string}), \
        dog=object({age = int, breed = string, kind = string, name = string}))";
    assert_eq!(model.arena.display(pet), expected);
    assert_eq!(model.arena.display(pet), expected);
    assert_eq!(model.arena.display(again), expected);
}

#[test]
fn equality_is_symmetric_across_insertion_order() {
    let model = pets_model();
    let pet = model.lookup("Pet").unwrap();
    let again = model.lookup("PetAgain").unwrap();
    assert_ne!(pet, again);
    assert!(model.arena.equals(pet, again));
    assert!(model.arena.equals(again, pet));
}

#[test]
fn traversal_follows_the_members() {
    let mut model = pets_model();
    // shared and identically typed
    assert_eq!(traverse(&mut model, "Pet", "name"), ("string".to_string(), vec![]));
    // only one member has it
    assert_eq!(traverse(&mut model, "Pet", "lives"), ("int".to_string(), vec![]));
    // shared with different types
    assert_eq!(traverse(&mut model, "Pet", "age"), ("union(int, number)".to_string(), vec![]));
    // nobody has it
    assert_eq!(
        traverse(&mut model, "Pet", "foo"),
        ("dynamic".to_string(), vec![DiagnosticKind::UnsupportedReceiverType])
    );
    // a string cannot be traversed further
    assert_eq!(
        traverse(&mut model, "Pet", "name.length"),
        ("dynamic".to_string(), vec![DiagnosticKind::UnsupportedReceiverType])
    );
}

#[test]
fn conversion_is_best_member_as_destination_worst_as_source() {
    let model = pets_model();
    let pet = model.lookup("Pet").unwrap();
    let cat_like = model.lookup("CatLike").unwrap();
    let walker = model.lookup("Walker").unwrap();
    let named = model.lookup("Named").unwrap();

    assert_eq!(model.arena.conversion_from(pet, cat_like), ConversionKind::SafeConversion);
    assert!(model.arena.assignable_from(pet, cat_like));

    // cat fits safely, dog's breed is only an unsafe bool
    assert_eq!(model.arena.conversion_from(walker, pet), ConversionKind::UnsafeConversion);
    // dog has no lives, cat fits safely
    assert_eq!(model.arena.conversion_from(named, pet), ConversionKind::UnsafeConversion);
    assert_eq!(model.arena.conversion_from(TypeId::STRING, pet), ConversionKind::NoConversion);
}

#[test]
fn unify_keeps_keys_and_the_weakest_conversion() {
    let mut model = pets_model();
    let pet = model.lookup("Pet").unwrap();
    let aged = model.lookup("Aged").unwrap();
    let (unified, kind) = model.arena.unify(pet, aged).unwrap();
    // cat: number ~ int is safe, dog: int ~ int is safe
    assert_eq!(kind, ConversionKind::SafeConversion);
    let Ty::DiscriminatedUnion(du) = model.arena.get(unified).clone() else {
        panic!("expected a discriminated union");
    };
    assert_eq!(du.discriminator(), "kind");
    assert_eq!(du.mapping().keys().collect::<Vec<_>>(), ["cat", "dog"]);
    let dog = du.member("dog").unwrap();
    assert_eq!(
        model.arena.display(dog),
        "object({age = int, breed = union(none, string), kind = union(none, string), name = union(none, string)})"
    );

    let lives_as_string = model.arena.object([("lives".to_string(), TypeId::STRING)].into_iter().collect());
    let (_, kind) = model.arena.unify(pet, lives_as_string).unwrap();
    // int ~ string only unifies unsafely on the cat side
    assert_eq!(kind, ConversionKind::UnsafeConversion);
}

#[test]
fn direct_construction_sorts_members() {
    let mut model = pets_model();
    let cat = model.lookup("Cat").unwrap();
    let dog = model.lookup("Dog").unwrap();
    let pet = model
        .arena
        .discriminated_union("kind", [("z".to_string(), dog), ("a".to_string(), cat)].into_iter().collect())
        .unwrap();
    let Ty::DiscriminatedUnion(du) = model.arena.get(pet) else {
        panic!("expected a discriminated union");
    };
    assert_eq!(du.mapping().keys().collect::<Vec<_>>(), ["a", "z"]);
    assert_eq!(du.member("a"), Some(cat));
}

#[test]
fn recursive_trees_compare_convert_and_unify() {
    let mut model = Schema::from_value(json!({ "types": {
        "Leaf": { "object": { "label": "string" } },
        "Branch": { "object": { "children": { "list": "Tree" } } },
        "Tree": { "discriminated_union": { "discriminator": "kind", "mapping": { "leaf": "Leaf", "branch": "Branch" } } },
        "OtherLeaf": { "object": { "label": "string" } },
        "OtherBranch": { "object": { "children": { "list": "OtherTree" } } },
        "OtherTree": { "discriminated_union": { "discriminator": "kind", "mapping": { "branch": "OtherBranch", "leaf": "OtherLeaf" } } },
        "IntLeaf": { "object": { "label": "int" } },
        "IntBranch": { "object": { "children": { "list": "IntTree" } } },
        "IntTree": { "discriminated_union": { "discriminator": "kind", "mapping": { "leaf": "IntLeaf", "branch": "IntBranch" } } },
    }}))
    .unwrap()
    .build()
    .unwrap();
    let tree = model.lookup("Tree").unwrap();
    let other = model.lookup("OtherTree").unwrap();
    let int_tree = model.lookup("IntTree").unwrap();

    assert_ne!(tree, other);
    assert!(model.arena.equals(tree, other));
    assert!(model.arena.equals(other, tree));
    assert!(!model.arena.equals(tree, int_tree));

    assert_eq!(model.arena.conversion_from(tree, other), ConversionKind::SafeConversion);
    assert!(model.arena.assignable_from(tree, other));
    // int labels widen to strings, strings only narrow to ints unsafely
    assert_eq!(model.arena.conversion_from(tree, int_tree), ConversionKind::SafeConversion);
    assert_eq!(model.arena.conversion_from(int_tree, tree), ConversionKind::UnsafeConversion);

    let (unified, kind) = model.arena.unify(tree, other).unwrap();
    assert_eq!(kind, ConversionKind::SafeConversion);
    assert!(model.arena.equals(unified, tree));

    let expected = "discriminated_union(kind, \
        branch=object({children = list(...)}), \
        leaf=object({label = string}))";
    assert_eq!(model.arena.display(tree), expected);
    assert_eq!(model.arena.display(other), expected);
}
