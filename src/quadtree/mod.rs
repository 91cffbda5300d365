pub mod columns;
pub mod container;
pub mod dcsc;
pub mod destructor;
pub mod inner;
pub mod node;
pub mod shadow_subdivision;
pub mod subdivide;
pub mod triples;
pub mod window_shadow;
