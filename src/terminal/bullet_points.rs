const INDENT_SIZE: usize = 2;

pub struct BulletPointPrinter<W: LineWriter + Clone> {
    writer: W,
    nesting: usize,
}

impl<W: LineWriter + Clone> BulletPointPrinter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, nesting: 0 }
    }

    pub fn print_item(&self, message: impl std::fmt::Display) {
        let indent = " ".repeat(self.nesting * INDENT_SIZE);
        self.writer.write_line(&format!("{}• {}", indent, message));
    }

    /// Print a line at the current nesting level without a bullet
    pub fn print_detail(&self, message: impl std::fmt::Display) {
        let indent = " ".repeat((self.nesting + 1) * INDENT_SIZE);
        self.writer.write_line(&format!("{}{}", indent, message));
    }

    pub fn indent(&self) -> Self {
        Self {
            writer: self.writer.clone(),
            nesting: self.nesting + 1,
        }
    }
}

impl BulletPointPrinter<StdoutLineWriter> {
    pub fn new_stdout() -> Self {
        Self::new(StdoutLineWriter)
    }
}

pub trait LineWriter {
    fn write_line(&self, line: &str);
}

#[derive(Clone, Copy)]
pub struct StdoutLineWriter;
impl LineWriter for StdoutLineWriter {
    fn write_line(&self, line: &str) {
        println!("{}", line);
    }
}

#[cfg(test)]
pub mod testutils {
    use std::{cell::RefCell, rc::Rc};

    use super::LineWriter;

    #[derive(Clone, Default)]
    pub struct VecLineWriter(pub Rc<RefCell<Vec<String>>>);

    impl VecLineWriter {
        pub fn lines(&self) -> Vec<String> {
            self.0.borrow().clone()
        }
    }

    impl LineWriter for VecLineWriter {
        fn write_line(&self, line: &str) {
            self.0.borrow_mut().push(line.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testutils::VecLineWriter;
    use super::*;

    #[test]
    fn test_nesting() {
        let writer = VecLineWriter::default();
        let printer = BulletPointPrinter::new(writer.clone());
        printer.print_item("Assets:Bank");
        let nested = printer.indent();
        nested.print_item("2024-01-01");
        nested.print_detail("opened");
        printer.print_item("Income:Salary");
        assert_eq!(
            vec![
                "• Assets:Bank".to_string(),
                "  • 2024-01-01".to_string(),
                "    opened".to_string(),
                "• Income:Salary".to_string(),
            ],
            writer.lines()
        );
    }
}
