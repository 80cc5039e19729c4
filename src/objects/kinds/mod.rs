//! Built-in object kinds.

pub mod billboard_panel;
pub mod chair;
pub mod control_panel;
pub mod controls;
pub mod cube;
pub mod generic;
pub mod sunflower;

use crate::objects::factory::ObjectFactory;

pub fn register_builtin(factory: &mut ObjectFactory) {
    factory.register(control_panel::KIND, control_panel::build);
    factory.register(cube::KIND, cube::build);
    factory.register(chair::KIND, chair::build);
    factory.register(billboard_panel::KIND, billboard_panel::build);
    factory.register(sunflower::KIND, sunflower::build);
    factory.register(generic::KIND, generic::build);
}
