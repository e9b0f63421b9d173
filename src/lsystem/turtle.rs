//! # 海龟解释
//!
//! 对展开后的符号串执行海龟行走，生成二维线段或三维线段图形。
//!
//! 二维符号：`+`/`-` 左/右转，`(`/`[` 入栈，`)`/`]` 出栈。
//! 三维另外支持 `^`/`&` 俯仰，`\`/`/` 滚转，`|` 掉头。
//! 字母表中的符号前进一个单位，按绘制标志决定是否输出线段。

use crate::error::{RenderError, Result};
use crate::geometry::figure::{Face, Figure};
use crate::geometry::line::Line2D;
use crate::lsystem::grammar::LSystemGrammar;
use crate::material_system::color::Color;
use nalgebra::{Point2, Point3, Vector2, Vector3};
use rand::Rng;

#[derive(Debug, Clone, Copy)]
struct Turtle2D {
    position: Point2<f64>,
    /// 朝向角（弧度）
    heading: f64,
}

/// 解释二维 L-系统，返回按绘制顺序排列的线段
pub fn draw_lsystem_2d<R: Rng + ?Sized>(
    grammar: &LSystemGrammar,
    color: Color,
    rng: &mut R,
) -> Result<Vec<Line2D>> {
    let commands = grammar.expand(rng)?;
    interpret_2d(grammar, &commands, color)
}

pub fn interpret_2d(grammar: &LSystemGrammar, commands: &str, color: Color) -> Result<Vec<Line2D>> {
    let delta = grammar.angle.to_radians();
    let mut turtle = Turtle2D {
        position: Point2::origin(),
        heading: grammar.starting_angle.to_radians(),
    };
    let mut stack = Vec::new();
    let mut lines = Vec::new();

    for (position, symbol) in commands.chars().enumerate() {
        match symbol {
            '+' => turtle.heading += delta,
            '-' => turtle.heading -= delta,
            '(' | '[' => stack.push(turtle),
            ')' | ']' => {
                turtle = stack
                    .pop()
                    .ok_or(RenderError::TurtleStackUnderflow { position })?;
            }
            c if grammar.is_letter(c) => {
                let step = Vector2::new(turtle.heading.cos(), turtle.heading.sin());
                let next = turtle.position + step;
                if grammar.draws(c) {
                    lines.push(Line2D::new(turtle.position, next, color));
                }
                turtle.position = next;
            }
            _ => {}
        }
    }
    Ok(lines)
}

/// 三维海龟：位置与正交基 (H 前进, L 左, U 上)
#[derive(Debug, Clone, Copy)]
struct Turtle3D {
    position: Point3<f64>,
    h: Vector3<f64>,
    l: Vector3<f64>,
    u: Vector3<f64>,
}

/// 在由 `a`、`b` 张成的平面内把 `a` 朝 `b` 旋转 `angle`
#[inline]
fn rotate_pair(a: Vector3<f64>, b: Vector3<f64>, angle: f64) -> (Vector3<f64>, Vector3<f64>) {
    let (sin, cos) = angle.sin_cos();
    (a * cos + b * sin, b * cos - a * sin)
}

/// 解释三维 L-系统，结果是由两点面（线段）组成的图形
pub fn draw_lsystem_3d<R: Rng + ?Sized>(
    grammar: &LSystemGrammar,
    color: Color,
    rng: &mut R,
) -> Result<Figure> {
    let commands = grammar.expand(rng)?;
    interpret_3d(grammar, &commands, color)
}

pub fn interpret_3d(grammar: &LSystemGrammar, commands: &str, color: Color) -> Result<Figure> {
    let turn = grammar.angle.to_radians();
    let pitch = grammar.pitch_angle.to_radians();
    let roll = grammar.roll_angle.to_radians();

    let mut turtle = Turtle3D {
        position: Point3::origin(),
        h: Vector3::x(),
        l: Vector3::y(),
        u: Vector3::z(),
    };
    let mut stack = Vec::new();
    let mut points = Vec::new();
    let mut faces = Vec::new();

    for (position, symbol) in commands.chars().enumerate() {
        match symbol {
            '+' => (turtle.h, turtle.l) = rotate_pair(turtle.h, turtle.l, turn),
            '-' => (turtle.h, turtle.l) = rotate_pair(turtle.h, turtle.l, -turn),
            '^' => (turtle.h, turtle.u) = rotate_pair(turtle.h, turtle.u, pitch),
            '&' => (turtle.h, turtle.u) = rotate_pair(turtle.h, turtle.u, -pitch),
            '\\' => (turtle.l, turtle.u) = rotate_pair(turtle.l, turtle.u, -roll),
            '/' => (turtle.l, turtle.u) = rotate_pair(turtle.l, turtle.u, roll),
            '|' => {
                turtle.h = -turtle.h;
                turtle.l = -turtle.l;
            }
            '(' | '[' => stack.push(turtle),
            ')' | ']' => {
                turtle = stack
                    .pop()
                    .ok_or(RenderError::TurtleStackUnderflow { position })?;
            }
            c if grammar.is_letter(c) => {
                let next = turtle.position + turtle.h;
                if grammar.draws(c) {
                    let start = points.len();
                    points.extend([turtle.position, next]);
                    faces.push(Face::new(vec![start, start + 1]));
                }
                turtle.position = next;
            }
            _ => {}
        }
    }

    let mut figure = Figure::new(points, faces);
    figure.color = color;
    Ok(figure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lsystem::grammar::tests::koch;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn koch_depth_two_emits_one_segment_per_letter() {
        let grammar = koch();
        let mut rng = StdRng::seed_from_u64(0);
        let color = Color::new(0.0, 1.0, 0.0);
        let lines = draw_lsystem_2d(&grammar, color, &mut rng).unwrap();

        let expanded = grammar.expand(&mut rng).unwrap();
        assert_eq!(lines.len(), grammar.count_letters(&expanded));
        assert_eq!(lines.len(), 16);
        assert!(lines.iter().all(|l| l.color == color));

        // 连续且单位长度
        for pair in lines.windows(2) {
            assert!((pair[0].p2 - pair[1].p1).norm() < 1e-12);
        }
        assert!(lines.iter().all(|l| ((l.p2 - l.p1).norm() - 1.0).abs() < 1e-12));

        // 科赫曲线两端相距 3^2 个单位
        let end = lines.last().unwrap().p2;
        assert!((end - Point2::new(9.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn hidden_letters_move_without_drawing() {
        let mut grammar = koch();
        grammar.alphabet.push('G');
        grammar.draw.insert('G', false);
        let lines = interpret_2d(&grammar, "FGF", Color::zeros()).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].p1, Point2::new(2.0, 0.0));
    }

    #[test]
    fn stack_restores_position_and_heading() {
        let grammar = koch();
        let lines = interpret_2d(&grammar, "F(+F)F", Color::zeros()).unwrap();
        assert_eq!(lines.len(), 3);
        assert!((lines[2].p1 - Point2::new(1.0, 0.0)).norm() < 1e-12);
        assert!((lines[2].p2 - Point2::new(2.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn pop_on_empty_stack_is_an_error() {
        let grammar = koch();
        assert!(matches!(
            interpret_2d(&grammar, "F)F", Color::zeros()),
            Err(RenderError::TurtleStackUnderflow { position: 1 })
        ));
        assert!(interpret_3d(&grammar, "]", Color::zeros()).is_err());
    }

    #[test]
    fn turtle_3d_pitch_and_roll_keep_basis_orthonormal() {
        let mut grammar = koch();
        grammar.angle = 90.0;
        grammar.pitch_angle = 90.0;
        grammar.roll_angle = 90.0;

        // 上仰90度后前进：沿 +Z
        let figure = interpret_3d(&grammar, "^F", Color::zeros()).unwrap();
        assert_eq!(figure.faces.len(), 1);
        assert!((figure.points[1] - Point3::new(0.0, 0.0, 1.0)).norm() < 1e-12);

        // 左转90度后前进：沿 +Y
        let figure = interpret_3d(&grammar, "+F", Color::zeros()).unwrap();
        assert!((figure.points[1] - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-12);

        // 滚转不改变前进方向，掉头反向
        let figure = interpret_3d(&grammar, "/F|F", Color::zeros()).unwrap();
        assert!((figure.points[1] - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
        assert!((figure.points[3] - Point3::origin()).norm() < 1e-12);
        figure.validate().unwrap();
    }
}
