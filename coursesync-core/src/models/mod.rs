mod answer;
mod course;
mod lesson;
mod question;
mod section;

pub use answer::Answer;
pub use course::CourseTree;
pub use lesson::Lesson;
pub use question::Question;
pub use section::Section;
