//! Builds a small basin step by step and prints the containment state after
//! each placement. Run with `cargo run --example basin_demo`.

use glam::IVec2;
use sim::Structure;

fn print_grid(s: &Structure) {
    for y in (0..s.height()).rev() {
        let mut line = String::new();
        for x in 0..s.width() {
            let cell = IVec2::new(x, y);
            line.push(if s.has_block(cell) {
                '#'
            } else if s.content_at(cell) > 0.0 {
                '~'
            } else if s.containable(cell) {
                '.'
            } else {
                ' '
            });
        }
        println!("|{line}|");
    }
    println!(
        "containers: {}, capacity: {}, stored: {:.2}\n",
        s.container_count(),
        s.capacity(),
        s.stored_water()
    );
}

fn main() {
    let mut s = Structure::new(12, 6);

    println!("floor:");
    for x in 2..=8 {
        s.set_block(IVec2::new(x, 0));
    }
    print_grid(&s);

    println!("walls:");
    for y in 1..=2 {
        s.set_block(IVec2::new(2, y));
        s.set_block(IVec2::new(8, y));
    }
    print_grid(&s);

    println!("pour 6.0:");
    let overflow = s.add_water(6.0);
    println!("overflow: {overflow:.2}");
    print_grid(&s);

    println!("divide the basin:");
    s.set_block(IVec2::new(5, 1));
    s.set_block(IVec2::new(5, 2));
    print_grid(&s);
}
