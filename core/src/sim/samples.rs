//! Sample program state
//!
//! The globals a small C++ program would leave behind: a colour, a vector,
//! a few structs and three kinds of iterator ranges.

use super::{Data, IterKind, SimProcess};
use crate::host::Host;

pub const VECTOR_TYPE: &str = "std::vector<int, std::allocator<int> >";
pub const VECTOR_ITERATOR_TYPE: &str =
    "__gnu_cxx::__normal_iterator<int*, std::vector<int, std::allocator<int> > >";

impl SimProcess {
    /// A process holding the sample globals
    ///
    /// | global | type |
    /// |---|---|
    /// | `color` | `ColorRGBA` (255, 128, 64, 200), static `channels` |
    /// | `table` | `int [4]` |
    /// | `numbers` | `std::vector<int>` of 35 elements `0..35` |
    /// | `wide` | `Wide`, twenty `int` fields `f0..f19` |
    /// | `label` | `Label { tag: 'A', name: "widget" }` |
    /// | `swatch` | `Swatch { id: 7, color }` |
    /// | `circle` | `Circle : Shape` |
    /// | `indexed_begin`, `indexed_end` | random-access range of 40 |
    /// | `list_begin`, `list_end` | forward range of 20 with `==` |
    /// | `stream_begin`, `stream_end` | forward range of 40 without `==` |
    pub fn with_samples() -> Self {
        let process = Self::new();
        process.add_colors();
        process.add_containers();
        process.add_structs();
        process.add_ranges();
        process
    }

    fn add_colors(&self) {
        self.define_struct(
            "ColorRGBA",
            &[
                ("r", "unsigned char"),
                ("g", "unsigned char"),
                ("b", "unsigned char"),
                ("a", "unsigned char"),
            ],
        );
        let channels = self.alloc_int("const int", 4);
        self.add_static("ColorRGBA", "channels", &channels);

        let color = self.alloc_struct("ColorRGBA", &[("r", 255), ("g", 128), ("b", 64), ("a", 200)]);
        self.set_global("color", color);

        let table = self.alloc_array("int", &[10, 20, 30, 40]);
        self.set_global("table", table);
    }

    fn add_containers(&self) {
        self.define_struct(VECTOR_ITERATOR_TYPE, &[("_M_current", "int *")]);
        self.define_struct(VECTOR_TYPE, &[("_M_start", "int *"), ("_M_finish", "int *")]);

        self.add_method(VECTOR_TYPE, "size", |process, v| {
            let start = process.field(v, "_M_start")?;
            let finish = process.field(v, "_M_finish")?;
            let size = process.pointer_difference(&finish, &start)?;
            Ok(process.alloc_int("unsigned long", size))
        });
        for (method, member) in [("begin", "_M_start"), ("end", "_M_finish")] {
            self.add_method(VECTOR_TYPE, method, move |process, v| {
                let pointer = process.field(v, member)?;
                let current = process.alloc_pointer("int *", process.to_integer(&pointer)? as u64);
                Ok(process.alloc_object(VECTOR_ITERATOR_TYPE, &[("_M_current", current)]))
            });
        }

        let values: Vec<i64> = (0..35).collect();
        let storage = self.alloc_array("int", &values);
        let bounds = self.index(&storage, 0).and_then(|first| {
            let start = self.address_of(&first)?;
            let finish = self.offset_pointer(&start, values.len() as i64)?;
            Ok((start, finish))
        });
        let numbers = match bounds {
            Ok((start, finish)) => {
                self.alloc_object(VECTOR_TYPE, &[("_M_start", start), ("_M_finish", finish)])
            }
            Err(e) => {
                tracing::warn!("sim: cannot build vector sample: {}", e);
                self.alloc_struct(VECTOR_TYPE, &[])
            }
        };
        self.set_global("numbers", numbers);
    }

    fn add_structs(&self) {
        let fields: Vec<String> = (0..20).map(|i| format!("f{}", i)).collect();
        let layout: Vec<(&str, &str)> = fields.iter().map(|f| (f.as_str(), "int")).collect();
        self.define_struct("Wide", &layout);
        let values: Vec<(&str, i64)> = fields.iter().zip(0..).map(|(f, i)| (f.as_str(), i)).collect();
        let wide = self.alloc_struct("Wide", &values);
        self.set_global("wide", wide);

        self.define_struct("Label", &[("tag", "char"), ("name", "char [8]")]);
        let name = self.alloc_string("widget", 8);
        let tag = self.alloc_int("char", 65);
        let label = self.alloc_object("Label", &[("tag", tag), ("name", name)]);
        self.set_global("label", label);

        self.define_struct("Swatch", &[("id", "int"), ("color", "ColorRGBA")]);
        let color = self.alloc_struct("ColorRGBA", &[("r", 255), ("g", 128), ("b", 64), ("a", 200)]);
        let id = self.alloc_int("int", 7);
        let swatch = self.alloc_object("Swatch", &[("id", id), ("color", color)]);
        self.set_global("swatch", swatch);

        self.define_struct("Shape", &[("id", "int")]);
        self.define_struct("Circle", &[("radius", "double")]);
        self.add_base("Circle", "Shape");
        let circle = self.alloc_struct("Circle", &[("radius", 2)]);
        if let Ok(shape) = self.base_class(&circle, "Shape") {
            if let Ok(id) = self.field(&shape, "id") {
                let _ = self.write(id.address, Data::Int(3));
            }
        }
        self.set_global("circle", circle);
    }

    fn add_ranges(&self) {
        self.define_iterator("IndexedIter", IterKind::Indexed, "int");
        self.define_iterator("ListIter", IterKind::Linked { equality: true }, "int");
        self.define_iterator("StreamIter", IterKind::Linked { equality: false }, "int");

        let values: Vec<i64> = (0..40).collect();
        let storage = self.alloc_array("int", &values);
        if let Ok((begin, end)) = self.alloc_indexed("IndexedIter", &storage) {
            self.set_global("indexed_begin", begin);
            self.set_global("indexed_end", end);
        }

        let (begin, end) = self.alloc_list("ListIter", &values[..20]);
        self.set_global("list_begin", begin);
        self.set_global("list_end", end);

        let (begin, end) = self.alloc_list("StreamIter", &values);
        self.set_global("stream_begin", begin);
        self.set_global("stream_end", end);
    }
}
